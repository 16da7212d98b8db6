use bytes::Bytes;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Request;

use super::AsrError;
use crate::core::conversation::OutboundEvent;

/// A transcript normalised from any provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub is_final: bool,
}

impl Transcript {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn complete(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn to_outbound(&self) -> OutboundEvent {
        if self.is_final {
            OutboundEvent::TranscriptFinal {
                text: self.text.clone(),
            }
        } else {
            OutboundEvent::TranscriptPartial {
                text: self.text.clone(),
            }
        }
    }
}

/// Wire shape of one upstream transcription vendor.
pub trait TranscriptionProfile: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upgrade request for the upstream socket, headers included.
    fn request(&self) -> Result<Request, AsrError>;

    /// First message after the socket opens, before any audio.
    fn handshake(&self) -> Option<String> {
        None
    }

    /// Wrap one PCM frame for the upstream socket.
    fn encode_frame(&self, frame: Bytes) -> Result<Message, AsrError>;

    /// Turn one upstream text message into zero or more transcripts.
    fn decode(&self, text: &str) -> Vec<Transcript>;
}
