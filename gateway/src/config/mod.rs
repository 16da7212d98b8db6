//! Gateway configuration
//!
//! `ServerConfig` is built from defaults, then `.env` and the process environment,
//! then an optional YAML file on top. The YAML layer only overrides what it names.
//!
//! ```rust,no_run
//! use voicepay_gateway::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_file(&"gateway.yaml".into())?;
//! assert!(config.confirm_timeout.as_millis() > 0);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::core::asr::AsrConfig;
use crate::core::session::DEFAULT_CONFIRM_TIMEOUT;

mod env;
mod merge;
mod validation;
mod yaml;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
pub const DEFAULT_RATE_LIMIT_BURST: u32 = 10;
pub const DEFAULT_PAYMENT_SERVICE_URL: &str = "http://localhost:4000/api";

/// PEM certificate chain and key served for `https://` and `wss://`.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Covers the listener, transport security, the conversation timing, the
/// transcription relay and the payment collaborator.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Security settings
    /// Comma-separated origins, or "*". None keeps the server same-origin.
    pub cors_allowed_origins: Option<String>,
    /// Per-IP request rate. Values of 100000 and above disable the limiter.
    pub rate_limit_requests_per_second: u32,
    pub rate_limit_burst_size: u32,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`. Only safe
    /// behind a reverse proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,

    /// How long a money proposal waits for an answer
    pub confirm_timeout: Duration,

    /// Streaming transcription relay
    pub asr: AsrConfig,

    /// Base URL of the payment link service (`/checkout`, `/split`)
    pub payment_service_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: None,
            cors_allowed_origins: None,
            rate_limit_requests_per_second: DEFAULT_RATE_LIMIT_RPS,
            rate_limit_burst_size: DEFAULT_RATE_LIMIT_BURST,
            trust_forwarded_headers: false,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            asr: AsrConfig::default(),
            payment_service_url: DEFAULT_PAYMENT_SERVICE_URL.to_string(),
        }
    }
}

/// Zeroize provider keys when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.asr.openai_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.asr.deepgram_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and `.env`, loaded by `main`).
    ///
    /// # Errors
    /// Returns an error if a numeric variable is malformed, `ASR_PROVIDER` names an
    /// unknown provider, or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer a YAML file over the environment.
    ///
    /// Fails when the file is unreadable or malformed, when the environment
    /// underneath is invalid, or when the merged result does not validate.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_asr(&self.asr)?;
        validation::validate_payment_service_url(&self.payment_service_url)?;
        validation::validate_rate_limit(
            self.rate_limit_requests_per_second,
            self.rate_limit_burst_size,
        )?;
        Ok(())
    }

    /// `host:port` to bind.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }
}
