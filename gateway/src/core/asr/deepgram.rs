use bytes::Bytes;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tracing::debug;

use super::AsrError;
use super::profile::{Transcript, TranscriptionProfile};

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Deserialize, Default)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

/// Streaming result. Metadata and other message types have no `channel`.
#[derive(Debug, Deserialize)]
struct ListenResult {
    #[serde(default)]
    channel: Option<Channel>,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    speech_final: bool,
}

/// Continuous binary profile (Deepgram live transcription).
pub struct DeepgramProfile {
    api_key: String,
    url: String,
}

impl DeepgramProfile {
    pub fn new(api_key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.into(),
        }
    }
}

impl TranscriptionProfile for DeepgramProfile {
    fn name(&self) -> &'static str {
        "deepgram"
    }

    fn request(&self) -> Result<Request, AsrError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| AsrError::InvalidRequest(format!("Invalid WebSocket URL: {e}")))?;
        request.headers_mut().insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {}", self.api_key))
                .map_err(|e| AsrError::InvalidRequest(e.to_string()))?,
        );
        Ok(request)
    }

    fn encode_frame(&self, frame: Bytes) -> Result<Message, AsrError> {
        Ok(Message::Binary(frame))
    }

    /// Every non-empty transcript is surfaced as a partial; when the provider
    /// marks the utterance done the same text follows as a final.
    fn decode(&self, text: &str) -> Vec<Transcript> {
        let result = match serde_json::from_str::<ListenResult>(text) {
            Ok(result) => result,
            Err(e) => {
                debug!("Unparseable Deepgram message: {}", e);
                return Vec::new();
            }
        };
        let Some(transcript) = result
            .channel
            .and_then(|c| c.alternatives.into_iter().next())
            .map(|alt| alt.transcript.trim().to_string())
            .filter(|t| !t.is_empty())
        else {
            return Vec::new();
        };

        let mut out = vec![Transcript::partial(transcript.clone())];
        if result.is_final || result.speech_final {
            out.push(Transcript::complete(transcript));
        }
        out
    }
}
