use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, confirm, events, interrupt};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP API router
///
/// The confirmation and interrupt endpoints key sessions by the caller's
/// network origin, so the app must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/api/confirm", post(confirm::confirm_handler))
        .route("/api/vad-interrupt", post(interrupt::vad_interrupt_handler))
        .route("/api/sessions/{key}/events", post(events::post_event))
        .layer(TraceLayer::new_for_http())
}
