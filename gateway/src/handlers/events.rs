use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::core::confirm::send_and_settle;
use crate::core::conversation::Event;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Feed a machine event into a session
///
/// `POST /api/sessions/{key}/events` with `{"type": "GPT_RESULT", "risk": "money",
/// "sentence": "...", "args": {...}}` or any other event. The session is created
/// when the key is new; its output waits in the backlog until a client connects.
pub async fn post_event(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let event_type = body
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let event = match serde_json::from_value::<Event>(body) {
        Ok(Event::Unrecognized) | Err(_) => {
            debug!(session = %key, event_type = %event_type, "Rejecting unknown event");
            return Err(AppError::UnknownEvent(event_type));
        }
        Ok(event) => event,
    };

    let session = state.registry.resolve(&key, None);
    let name = event.name();
    let dispatch = send_and_settle(&session, &state.payments, event);

    info!(
        session = %key,
        event = name,
        from = %dispatch.previous,
        to = %dispatch.state,
        "Event injected"
    );

    Ok(Json(json!({
        "state": dispatch.state,
        "transitioned": dispatch.transitioned,
    })))
}
