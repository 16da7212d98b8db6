//! Control frames a client sends over the duplex connection.

use serde::Deserialize;

use crate::core::conversation::Event;

/// Maximum accepted size of a text control frame (64 KB)
pub const MAX_CONTROL_FRAME_SIZE: usize = 64 * 1024;

/// Incoming text frames, `{"type": "<snake_case>", ...}`.
///
/// Frames with any other `type` fail to parse and are dropped by the handler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
    /// Browser-side voice activity detected while audio was playing
    VadInterrupt,
    MicPress,
    RecordEnd {
        #[serde(default)]
        text: String,
    },
    TtsEnd,
    /// Spoken yes/no answer to a pending `confirm_request`
    Confirm {
        #[serde(default)]
        answer: Option<String>,
    },
}

impl ClientFrame {
    /// Machine event for frames that map one-to-one onto the conversation.
    pub fn as_event(&self) -> Option<Event> {
        match self {
            ClientFrame::MicPress => Some(Event::MicPress),
            ClientFrame::RecordEnd { text } => Some(Event::RecordEnd { text: text.clone() }),
            ClientFrame::TtsEnd => Some(Event::TtsEnd),
            ClientFrame::VadInterrupt => Some(Event::UserInterrupt),
            ClientFrame::Ping | ClientFrame::Confirm { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_frames() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Ping);

        let frame: ClientFrame = serde_json::from_str(r#"{"type":"vad_interrupt"}"#).unwrap();
        assert_eq!(frame.as_event(), Some(Event::UserInterrupt));

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"record_end","text":"pay bob"}"#).unwrap();
        assert_eq!(
            frame.as_event(),
            Some(Event::RecordEnd {
                text: "pay bob".to_string()
            })
        );

        let frame: ClientFrame =
            serde_json::from_str(r#"{"type":"confirm","answer":"yes please"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Confirm {
                answer: Some("yes please".to_string())
            }
        );
        assert_eq!(frame.as_event(), None);
    }

    #[test]
    fn test_record_end_without_text() {
        let frame: ClientFrame = serde_json::from_str(r#"{"type":"record_end"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::RecordEnd {
                text: String::new()
            }
        );
    }

    #[test]
    fn test_unknown_or_malformed_frames_fail() {
        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"dance"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>(r#"{"kind":"ping"}"#).is_err());
        assert!(serde_json::from_str::<ClientFrame>("not json").is_err());
    }
}
