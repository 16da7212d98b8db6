//! Duplex session WebSocket route

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::session::session_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the session WebSocket router
///
/// # Endpoint
///
/// `GET /ws/session` - WebSocket upgrade for the conversation relay
///
/// # Example
///
/// ```json
/// // Server greets first
/// {"type": "hello", "sessionId": "5f0c...", "ts": 1735689600000}
///
/// // Client control frames
/// {"type": "ping"}
/// {"type": "vad_interrupt"}
///
/// // Server events
/// {"type": "state_change", "state": "ConfirmWait"}
/// {"type": "confirm_request", "sentence": "Send $10 to Alice?", "amount": 1000, "recipient": "alice@example.com", "friends": null}
/// ```
pub fn create_session_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/session", get(session_handler))
        .layer(TraceLayer::new_for_http())
}
