use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::state::{ConversationState, FriendEntry, PendingArgs};
use crate::core::payments::PaymentLink;

/// Messages the server pushes to the client over the duplex connection.
///
/// Wire form is `{"type": "<snake_case>", ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Hello {
        #[serde(rename = "sessionId")]
        session_id: String,
        ts: u64,
    },
    StateChange {
        state: ConversationState,
    },
    ConfirmRequest {
        sentence: String,
        amount: Option<u64>,
        recipient: Option<String>,
        friends: Option<Vec<FriendEntry>>,
    },
    SpeakSentence {
        sentence: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        links: Option<Vec<PaymentLink>>,
    },
    PauseAudio,
    ConfirmCancelled,
    Pong {
        ts: u64,
    },
    TranscriptPartial {
        text: String,
    },
    TranscriptFinal {
        text: String,
    },
    Error {
        reason: String,
    },
}

impl OutboundEvent {
    pub fn confirm_request(sentence: &str, args: Option<&PendingArgs>) -> Self {
        OutboundEvent::ConfirmRequest {
            sentence: sentence.to_string(),
            amount: args.and_then(PendingArgs::amount),
            recipient: args.and_then(|a| a.recipient_email.clone()),
            friends: args.and_then(|a| a.friends.clone()),
        }
    }

    pub fn speak(sentence: impl Into<String>) -> Self {
        OutboundEvent::SpeakSentence {
            sentence: sentence.into(),
            url: None,
            links: None,
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        OutboundEvent::Error {
            reason: reason.into(),
        }
    }

    pub fn hello(session_id: impl Into<String>) -> Self {
        OutboundEvent::Hello {
            session_id: session_id.into(),
            ts: timestamp_millis(),
        }
    }

    pub fn pong() -> Self {
        OutboundEvent::Pong {
            ts: timestamp_millis(),
        }
    }

    /// Wire name of the event (the `type` field).
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::Hello { .. } => "hello",
            OutboundEvent::StateChange { .. } => "state_change",
            OutboundEvent::ConfirmRequest { .. } => "confirm_request",
            OutboundEvent::SpeakSentence { .. } => "speak_sentence",
            OutboundEvent::PauseAudio => "pause_audio",
            OutboundEvent::ConfirmCancelled => "confirm_cancelled",
            OutboundEvent::Pong { .. } => "pong",
            OutboundEvent::TranscriptPartial { .. } => "transcript_partial",
            OutboundEvent::TranscriptFinal { .. } => "transcript_final",
            OutboundEvent::Error { .. } => "error",
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
