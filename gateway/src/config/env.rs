//! Environment variable loading.
//!
//! `.env` is read into the process environment by `main` before any of this
//! runs, so real environment variables and `.env` values look the same here.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::asr::{AsrConfig, AsrProvider};
use crate::core::session::DEFAULT_CONFIRM_TIMEOUT;

use super::{
    DEFAULT_HOST, DEFAULT_PAYMENT_SERVICE_URL, DEFAULT_PORT, DEFAULT_RATE_LIMIT_BURST,
    DEFAULT_RATE_LIMIT_RPS, ServerConfig, TlsConfig,
};

/// Non-empty, trimmed value of `key`.
pub(super) fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Zero falls back to the default.
pub(super) fn confirm_timeout_from_millis(millis: u64) -> Duration {
    if millis == 0 {
        DEFAULT_CONFIRM_TIMEOUT
    } else {
        Duration::from_millis(millis)
    }
}

/// Unparseable values fall back to the default instead of failing startup.
pub(super) fn parse_confirm_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .map(confirm_timeout_from_millis)
        .unwrap_or(DEFAULT_CONFIRM_TIMEOUT)
}

fn parse_number<T: std::str::FromStr>(
    key: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| format!("Invalid {key} value '{raw}': {e}").into()),
        None => Ok(default),
    }
}

fn load_tls() -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    let enabled = env_var("TLS_ENABLED").is_some_and(|v| parse_bool(&v));
    if !enabled {
        return Ok(None);
    }

    let cert_path =
        env_var("TLS_CERT_PATH").ok_or("TLS_ENABLED is set but TLS_CERT_PATH is missing")?;
    let key_path =
        env_var("TLS_KEY_PATH").ok_or("TLS_ENABLED is set but TLS_KEY_PATH is missing")?;

    Ok(Some(TlsConfig {
        cert_path: PathBuf::from(cert_path),
        key_path: PathBuf::from(key_path),
    }))
}

fn load_asr() -> Result<AsrConfig, Box<dyn std::error::Error>> {
    let defaults = AsrConfig::default();

    let provider = match env_var("ASR_PROVIDER") {
        Some(raw) => raw.parse::<AsrProvider>()?,
        None => defaults.provider,
    };

    Ok(AsrConfig {
        enabled: env_var("ASR_STREAMING").is_some_and(|v| parse_bool(&v)),
        provider,
        openai_api_key: env_var("OPENAI_API_KEY"),
        openai_ws_url: env_var("OPENAI_AUDIO_WS").unwrap_or(defaults.openai_ws_url),
        openai_model: env_var("OPENAI_AUDIO_MODEL").unwrap_or(defaults.openai_model),
        deepgram_api_key: env_var("DEEPGRAM_API_KEY"),
        deepgram_ws_url: env_var("DEEPGRAM_AUDIO_WS").unwrap_or(defaults.deepgram_ws_url),
    })
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    Ok(ServerConfig {
        host: env_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_number("PORT", DEFAULT_PORT)?,
        tls: load_tls()?,
        cors_allowed_origins: env_var("CORS_ALLOWED_ORIGINS"),
        rate_limit_requests_per_second: parse_number(
            "RATE_LIMIT_REQUESTS_PER_SECOND",
            DEFAULT_RATE_LIMIT_RPS,
        )?,
        rate_limit_burst_size: parse_number("RATE_LIMIT_BURST_SIZE", DEFAULT_RATE_LIMIT_BURST)?,
        trust_forwarded_headers: env_var("TRUST_FORWARDED_HEADERS").is_some_and(|v| parse_bool(&v)),
        confirm_timeout: parse_confirm_timeout(env_var("CONFIRM_TIMEOUT_MS").as_deref()),
        asr: load_asr()?,
        payment_service_url: env_var("PAYMENT_SERVICE_URL")
            .unwrap_or_else(|| DEFAULT_PAYMENT_SERVICE_URL.to_string()),
    })
}
