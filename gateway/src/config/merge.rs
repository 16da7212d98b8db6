//! Layering of YAML overrides on top of the environment configuration.

use std::path::PathBuf;

use crate::core::asr::AsrProvider;

use super::env::{confirm_timeout_from_millis, load_from_env};
use super::yaml::{TlsYaml, YamlConfig};
use super::{ServerConfig, TlsConfig};

/// Load the environment configuration and apply `yaml` on top.
///
/// Only values present in the YAML replace environment values.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = load_from_env()?;

    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            config.tls = merge_tls(config.tls.take(), tls)?;
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if let Some(trust) = security.trust_forwarded_headers {
            config.trust_forwarded_headers = trust;
        }
    }

    if let Some(conversation) = yaml.conversation
        && let Some(millis) = conversation.confirm_timeout_ms
    {
        config.confirm_timeout = confirm_timeout_from_millis(millis);
    }

    if let Some(asr) = yaml.asr {
        if let Some(enabled) = asr.enabled {
            config.asr.enabled = enabled;
        }
        if let Some(provider) = asr.provider {
            config.asr.provider = provider.parse::<AsrProvider>()?;
        }
        if let Some(key) = asr.openai_api_key {
            config.asr.openai_api_key = Some(key);
        }
        if let Some(url) = asr.openai_ws_url {
            config.asr.openai_ws_url = url;
        }
        if let Some(model) = asr.openai_model {
            config.asr.openai_model = model;
        }
        if let Some(key) = asr.deepgram_api_key {
            config.asr.deepgram_api_key = Some(key);
        }
        if let Some(url) = asr.deepgram_ws_url {
            config.asr.deepgram_ws_url = url;
        }
    }

    if let Some(payments) = yaml.payments
        && let Some(url) = payments.service_url
    {
        config.payment_service_url = url;
    }

    Ok(config)
}

fn merge_tls(
    base: Option<TlsConfig>,
    yaml: TlsYaml,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    if yaml.enabled == Some(false) {
        return Ok(None);
    }

    let cert_path = yaml
        .cert_path
        .map(PathBuf::from)
        .or_else(|| base.as_ref().map(|tls| tls.cert_path.clone()));
    let key_path = yaml
        .key_path
        .map(PathBuf::from)
        .or_else(|| base.as_ref().map(|tls| tls.key_path.clone()));

    if yaml.enabled != Some(true) && base.is_none() {
        return Ok(None);
    }

    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path,
            key_path,
        })),
        _ => Err("TLS is enabled but cert_path or key_path is missing".into()),
    }
}
