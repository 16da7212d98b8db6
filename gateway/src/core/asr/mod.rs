//! Streaming transcription relay.
//!
//! One [`AsrProxy`] per duplex connection forwards raw PCM frames to an upstream
//! provider and normalises whatever the provider sends back into
//! `transcript_partial` / `transcript_final` events. Provider differences live
//! behind [`TranscriptionProfile`]:
//!
//! - [`OpenAiProfile`]: JSON envelope, session handshake, base64 audio appends
//! - [`DeepgramProfile`]: raw binary audio, no handshake, alternatives-based results

mod config;
mod deepgram;
mod openai;
mod profile;
mod proxy;


pub use config::{
    AsrConfig, AsrProvider, DEFAULT_DEEPGRAM_WS_URL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_WS_URL,
};
pub use deepgram::DeepgramProfile;
pub use openai::OpenAiProfile;
pub use profile::{Transcript, TranscriptionProfile};
pub use proxy::{AsrProxy, DEFAULT_CONNECT_TIMEOUT, TranscriptCallback};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("Missing API key for {0} transcription")]
    MissingApiKey(&'static str),
    #[error("Invalid upstream request: {0}")]
    InvalidRequest(String),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Failed to encode frame: {0}")]
    Encode(String),
}

/// Build the profile selected by `config`.
pub fn profile_for(config: &AsrConfig) -> Result<Box<dyn TranscriptionProfile>, AsrError> {
    match config.provider {
        AsrProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(AsrError::MissingApiKey("openai"))?;
            Ok(Box::new(OpenAiProfile::new(
                api_key,
                config.openai_ws_url.clone(),
                config.openai_model.clone(),
            )))
        }
        AsrProvider::Deepgram => {
            let api_key = config
                .deepgram_api_key
                .clone()
                .ok_or(AsrError::MissingApiKey("deepgram"))?;
            Ok(Box::new(DeepgramProfile::new(
                api_key,
                config.deepgram_ws_url.clone(),
            )))
        }
    }
}
