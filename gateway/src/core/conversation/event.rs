use serde::{Deserialize, Serialize};

use super::state::PendingArgs;

/// Risk classification attached to an agent decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    /// The proposed action moves funds and needs a spoken confirmation.
    Money,
    #[serde(other)]
    Safe,
}

/// Inputs to the conversation machine.
///
/// Serialized with a `type` tag in SCREAMING_SNAKE_CASE (`MIC_PRESS`,
/// `GPT_RESULT`, ...). Anything else decodes to [`Event::Unrecognized`],
/// which every state ignores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    MicPress,
    RecordEnd {
        #[serde(default)]
        text: String,
    },
    TranscriptFinal {
        #[serde(default)]
        text: String,
    },
    GptResult {
        risk: Risk,
        #[serde(default)]
        sentence: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<PendingArgs>,
    },
    UserInterrupt,
    TtsEnd,
    ConfirmTimeout,
    ConfirmAccepted,
    ConfirmRejected,
    #[serde(other)]
    Unrecognized,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::MicPress => "MIC_PRESS",
            Event::RecordEnd { .. } => "RECORD_END",
            Event::TranscriptFinal { .. } => "TRANSCRIPT_FINAL",
            Event::GptResult { .. } => "GPT_RESULT",
            Event::UserInterrupt => "USER_INTERRUPT",
            Event::TtsEnd => "TTS_END",
            Event::ConfirmTimeout => "CONFIRM_TIMEOUT",
            Event::ConfirmAccepted => "CONFIRM_ACCEPTED",
            Event::ConfirmRejected => "CONFIRM_REJECTED",
            Event::Unrecognized => "UNRECOGNIZED",
        }
    }

    pub fn money(sentence: impl Into<String>, args: Option<PendingArgs>) -> Self {
        Event::GptResult {
            risk: Risk::Money,
            sentence: sentence.into(),
            args,
        }
    }

    pub fn safe(sentence: impl Into<String>) -> Self {
        Event::GptResult {
            risk: Risk::Safe,
            sentence: sentence.into(),
            args: None,
        }
    }
}
