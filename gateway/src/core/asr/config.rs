use std::fmt;
use std::str::FromStr;

pub const DEFAULT_OPENAI_WS_URL: &str = "wss://api.openai.com/v1/realtime?intent=transcription";
pub const DEFAULT_OPENAI_MODEL: &str = "whisper-large-v3";
pub const DEFAULT_DEEPGRAM_WS_URL: &str =
    "wss://api.deepgram.com/v1/listen?punctuate=true&encoding=linear16&sample_rate=16000";

/// Upstream transcription vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsrProvider {
    #[default]
    OpenAi,
    Deepgram,
}

impl AsrProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsrProvider::OpenAi => "openai",
            AsrProvider::Deepgram => "deepgram",
        }
    }
}

impl fmt::Display for AsrProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AsrProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(AsrProvider::OpenAi),
            "deepgram" => Ok(AsrProvider::Deepgram),
            other => Err(format!(
                "Unsupported ASR provider '{other}'. Expected 'openai' or 'deepgram'"
            )),
        }
    }
}

/// Transcription relay settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsrConfig {
    /// Whether binary frames on the duplex connection are relayed upstream.
    pub enabled: bool,
    pub provider: AsrProvider,
    pub openai_api_key: Option<String>,
    pub openai_ws_url: String,
    pub openai_model: String,
    pub deepgram_api_key: Option<String>,
    pub deepgram_ws_url: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: AsrProvider::default(),
            openai_api_key: None,
            openai_ws_url: DEFAULT_OPENAI_WS_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            deepgram_api_key: None,
            deepgram_ws_url: DEFAULT_DEEPGRAM_WS_URL.to_string(),
        }
    }
}

impl AsrConfig {
    /// API key of the selected provider.
    pub fn active_api_key(&self) -> Option<&str> {
        match self.provider {
            AsrProvider::OpenAi => self.openai_api_key.as_deref(),
            AsrProvider::Deepgram => self.deepgram_api_key.as_deref(),
        }
    }

    pub fn active_ws_url(&self) -> &str {
        match self.provider {
            AsrProvider::OpenAi => &self.openai_ws_url,
            AsrProvider::Deepgram => &self.deepgram_ws_url,
        }
    }
}
