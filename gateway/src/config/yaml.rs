use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// Every field is optional so a file can override just the values it names.
/// Anything left out falls back to environment variables, then defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 4000
///   tls:
///     enabled: true
///     cert_path: "/etc/voicepay/cert.pem"
///     key_path: "/etc/voicepay/key.pem"
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   trust_forwarded_headers: false
///
/// conversation:
///   confirm_timeout_ms: 30000
///
/// asr:
///   enabled: true
///   provider: "deepgram"
///   deepgram_api_key: "your-deepgram-key"
///
/// payments:
///   service_url: "http://localhost:4000/api"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub security: Option<SecurityYaml>,
    pub conversation: Option<ConversationYaml>,
    pub asr: Option<AsrYaml>,
    pub payments: Option<PaymentsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub trust_forwarded_headers: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConversationYaml {
    /// How long a money proposal waits for yes/no before it is cancelled
    pub confirm_timeout_ms: Option<u64>,
}

/// Streaming transcription settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AsrYaml {
    pub enabled: Option<bool>,
    /// "openai" or "deepgram"
    pub provider: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_ws_url: Option<String>,
    pub openai_model: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub deepgram_ws_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PaymentsYaml {
    /// Base URL of the payment link service
    pub service_url: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
