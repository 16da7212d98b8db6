use base64::prelude::*;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tracing::debug;

use super::AsrError;
use super::profile::{Transcript, TranscriptionProfile};

#[derive(Debug, Serialize)]
struct InputAudioTranscription<'a> {
    model: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad,
}

#[derive(Debug, Serialize)]
struct TranscriptionSession<'a> {
    input_audio_format: &'a str,
    input_audio_transcription: InputAudioTranscription<'a>,
    turn_detection: TurnDetection,
}

/// Messages sent to the transcription session.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ClientEvent<'a> {
    #[serde(rename = "transcription_session.update")]
    SessionUpdate { session: TranscriptionSession<'a> },
    #[serde(rename = "input_audio_buffer.append")]
    AudioAppend { audio: String },
}

/// Transcript events received from the session. Both the short and the
/// `conversation.item.` prefixed names are accepted.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ServerEvent {
    #[serde(
        rename = "input_audio_transcription.partial",
        alias = "conversation.item.input_audio_transcription.delta"
    )]
    Partial {
        #[serde(default, alias = "delta")]
        text: String,
    },
    #[serde(
        rename = "input_audio_transcription.complete",
        alias = "conversation.item.input_audio_transcription.completed"
    )]
    Complete {
        #[serde(default, alias = "transcript")]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Turn-detecting JSON profile (OpenAI realtime transcription).
pub struct OpenAiProfile {
    api_key: String,
    url: String,
    model: String,
}

impl OpenAiProfile {
    pub fn new(api_key: impl Into<String>, url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: url.into(),
            model: model.into(),
        }
    }
}

impl TranscriptionProfile for OpenAiProfile {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn request(&self) -> Result<Request, AsrError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| AsrError::InvalidRequest(format!("Invalid WebSocket URL: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| AsrError::InvalidRequest(e.to_string()))?,
        );
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));
        headers.insert(
            header::SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static("realtime"),
        );
        Ok(request)
    }

    fn handshake(&self) -> Option<String> {
        let update = ClientEvent::SessionUpdate {
            session: TranscriptionSession {
                input_audio_format: "pcm16",
                input_audio_transcription: InputAudioTranscription { model: &self.model },
                turn_detection: TurnDetection::ServerVad,
            },
        };
        serde_json::to_string(&update).ok()
    }

    fn encode_frame(&self, frame: Bytes) -> Result<Message, AsrError> {
        let append = ClientEvent::AudioAppend {
            audio: BASE64_STANDARD.encode(&frame),
        };
        let json = serde_json::to_string(&append).map_err(|e| AsrError::Encode(e.to_string()))?;
        Ok(Message::Text(json.into()))
    }

    fn decode(&self, text: &str) -> Vec<Transcript> {
        match serde_json::from_str::<ServerEvent>(text) {
            Ok(ServerEvent::Partial { text }) => vec![Transcript::partial(text)],
            Ok(ServerEvent::Complete { text }) => vec![Transcript::complete(text)],
            Ok(ServerEvent::Other) => Vec::new(),
            Err(e) => {
                debug!("Unparseable OpenAI transcription message: {}", e);
                Vec::new()
            }
        }
    }
}
