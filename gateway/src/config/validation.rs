//! Checks run on the final, merged configuration.

use url::Url;

use crate::core::asr::AsrConfig;

/// Streaming transcription needs the selected provider's key.
pub(super) fn validate_asr(asr: &AsrConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !asr.enabled {
        return Ok(());
    }

    if asr.active_api_key().is_none_or(|key| key.trim().is_empty()) {
        return Err(format!(
            "ASR streaming is enabled with provider '{}' but no API key is configured",
            asr.provider
        )
        .into());
    }

    let ws_url = Url::parse(asr.active_ws_url())
        .map_err(|e| format!("Invalid {} transcription URL: {e}", asr.provider))?;
    if !matches!(ws_url.scheme(), "ws" | "wss") {
        return Err(format!(
            "Transcription URL for '{}' must use ws:// or wss://, got '{}'",
            asr.provider,
            ws_url.scheme()
        )
        .into());
    }

    Ok(())
}

pub(super) fn validate_payment_service_url(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = Url::parse(url).map_err(|e| format!("Invalid payment service URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("Payment service URL must use http:// or https://, got '{url}'").into());
    }
    Ok(())
}

pub(super) fn validate_rate_limit(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if requests_per_second == 0 || burst_size == 0 {
        return Err("Rate limit requests per second and burst size must be greater than zero".into());
    }
    Ok(())
}
