use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
};
use tracing::debug;

use crate::core::conversation::{ConversationState, Event, OutboundEvent};
use crate::handlers::peer::transport_key;
use crate::state::AppState;

/// Browser-side voice activity detected during playback
///
/// Interrupts the caller's session only while it is thinking or speaking, so a
/// VAD hit during `ConfirmWait` does not throw away the yes/no flow. Audio is
/// paused on every open connection regardless. Always 204.
pub async fn vad_interrupt_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> StatusCode {
    let key = transport_key(&headers, peer, state.config.trust_forwarded_headers);
    let session = state.registry.resolve(&key, None);
    let current = session.state();

    if matches!(
        current,
        ConversationState::Speaking | ConversationState::Thinking
    ) {
        session.send(Event::UserInterrupt);
    }

    let reached = state.hub.broadcast(&OutboundEvent::PauseAudio);
    debug!(session = %key, state = %current, reached, "VAD interrupt");

    StatusCode::NO_CONTENT
}
