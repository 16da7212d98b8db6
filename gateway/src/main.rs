use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use anyhow::{Context, anyhow};
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use http::{HeaderValue, Method, header};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use voicepay_gateway::{ServerConfig, config::TlsConfig, routes, state::AppState};

/// At or above this rate the limiter is left out entirely.
const RATE_LIMIT_OFF_THRESHOLD: u32 = 100_000;

/// VoicePay Gateway - voice-driven payment conversations
#[derive(Parser, Debug)]
#[command(name = "voicepay-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// YAML configuration file; environment variables are used when omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env must be loaded before the config reads the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Upstream transcription and the payment client both use rustls
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Could not install the ring crypto provider"))?;

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => {
            info!("Reading configuration from {}", path.display());
            ServerConfig::from_file(&path).map_err(|e| anyhow!(e.to_string()))?
        }
        None => ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?,
    };

    log_settings(&config);

    let socket_addr: SocketAddr = config
        .address()
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.address()))?;
    let tls = config.tls.clone();

    let requests_per_second = config.rate_limit_requests_per_second;
    let burst_size = config.rate_limit_burst_size;
    let rate_limit_rejected =
        || anyhow!("Rate limiter rejected {requests_per_second}/s burst {burst_size}");
    // The two extractors produce different layer types, so each gets its own slot.
    let (peer_limiter, forwarded_limiter) = if requests_per_second >= RATE_LIMIT_OFF_THRESHOLD {
        warn!(requests_per_second, "Per-IP rate limiting disabled");
        (None, None)
    } else if config.trust_forwarded_headers {
        let limits = GovernorConfigBuilder::default()
            .per_second(requests_per_second.into())
            .burst_size(burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(rate_limit_rejected)?;
        info!(
            requests_per_second,
            burst_size, "Per-IP rate limiting enabled, keyed on forwarded headers"
        );
        (None, Some(GovernorLayer::new(limits)))
    } else {
        let limits = GovernorConfigBuilder::default()
            .per_second(requests_per_second.into())
            .burst_size(burst_size)
            .finish()
            .ok_or_else(rate_limit_rejected)?;
        info!(requests_per_second, burst_size, "Per-IP rate limiting enabled");
        (Some(GovernorLayer::new(limits)), None)
    };
    let cors = cors_layer(config.cors_allowed_origins.as_deref());

    let app = build_app(AppState::new(config))
        .layer(cors)
        .layer(tower::util::option_layer(peer_limiter))
        .layer(tower::util::option_layer(forwarded_limiter))
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                )),
        );

    match tls {
        Some(tls) => serve_tls(app, socket_addr, &tls).await,
        None => {
            info!("VoicePay gateway listening on http://{}", socket_addr);
            let listener = TcpListener::bind(socket_addr).await?;
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await?;
            Ok(())
        }
    }
}

fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::api::create_api_router())
        .merge(routes::session::create_session_router())
        .with_state(state)
}

fn log_settings(config: &ServerConfig) {
    if config.trust_forwarded_headers {
        warn!("Trusting X-Forwarded-For / X-Real-IP for client addresses");
    }
    if config.asr.enabled {
        info!(provider = %config.asr.provider, "Streaming transcription enabled");
    } else {
        info!("Streaming transcription disabled, binary frames will be ignored");
    }
    info!(
        confirm_timeout_ms = config.confirm_timeout.as_millis() as u64,
        payment_service = %config.payment_service_url,
        "Conversation settings"
    );
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match allowed_origins {
        Some("*") => base.allow_origin(Any).allow_credentials(false),
        Some(list) => {
            let origins: Vec<HeaderValue> = list
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            base.allow_origin(origins).allow_credentials(true)
        }
        None => {
            info!("CORS_ALLOWED_ORIGINS unset, serving same-origin clients only");
            base.allow_credentials(false)
        }
    }
}

async fn serve_tls(app: Router, socket_addr: SocketAddr, tls: &TlsConfig) -> anyhow::Result<()> {
    let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
        .await
        .with_context(|| {
            format!(
                "Could not load TLS certificate {} or key {}",
                tls.cert_path.display(),
                tls.key_path.display()
            )
        })?;

    info!("VoicePay gateway listening on https://{} (TLS)", socket_addr);

    axum_server::bind_rustls(socket_addr, rustls_config)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("TLS server failed")
}
