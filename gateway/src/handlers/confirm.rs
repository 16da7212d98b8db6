use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::core::confirm::{
    CANCELLED_SENTENCE, ConfirmOutcome, REPROMPT_SENTENCE, parse_yes_no, resolve_confirmation,
};
use crate::core::payments::PaymentOutcome;
use crate::core::session::Reconciled;
use crate::errors::{AppError, AppResult};
use crate::handlers::peer::transport_key;
use crate::state::AppState;

/// Body of `POST /api/confirm`. Fields are loosely typed so a wrong type reads
/// as "missing" rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<Value>,
    #[serde(default)]
    pub answer: Option<Value>,
}

/// Answer a pending money proposal
///
/// The session is found by the caller's `sessionId` first and the request's
/// network origin second; see `SessionRegistry::reconcile`.
///
/// Responses:
/// - `{speak, ui:"confirm"}` when the answer is neither yes nor no
/// - `{speak, ui:"none"}` after a no
/// - `{ok:true, speak, url}` or `{ok:true, speak, links}` after a yes
/// - 400 `answer_required`, 409 `no_pending_confirmation`, 500 `confirm_failed`
pub async fn confirm_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<ConfirmRequest>,
) -> AppResult<Json<Value>> {
    let answer = request
        .answer
        .as_ref()
        .and_then(Value::as_str)
        .filter(|a| !a.is_empty())
        .ok_or(AppError::AnswerRequired)?;

    let Some(decision) = parse_yes_no(answer) else {
        return Ok(Json(json!({ "speak": REPROMPT_SENTENCE, "ui": "confirm" })));
    };

    let caller_key = request.session_id.as_ref().and_then(Value::as_str);
    let transport = transport_key(&headers, peer, state.config.trust_forwarded_headers);

    let Reconciled { session, found_via } = state
        .registry
        .reconcile(caller_key, &transport)
        .inspect_err(|_| {
            debug!(
                caller_key = ?caller_key,
                transport_key = %transport,
                "No pending confirmation"
            );
        })?;

    debug!(
        caller_key = ?caller_key,
        transport_key = %transport,
        found_via = found_via.as_str(),
        session = %session.key(),
        "Confirmation reconciled"
    );

    let outcome = resolve_confirmation(&session, state.payments.as_ref(), decision).await?;
    info!(session = %session.key(), ?decision, "Confirmation answered");

    Ok(Json(match outcome {
        ConfirmOutcome::Cancelled => json!({ "speak": CANCELLED_SENTENCE, "ui": "none" }),
        ConfirmOutcome::Settled(outcome) => {
            let speak = outcome.sentence();
            match outcome {
                PaymentOutcome::Checkout { url } => {
                    json!({ "ok": true, "speak": speak, "url": url })
                }
                PaymentOutcome::Split { links } => {
                    json!({ "ok": true, "speak": speak, "links": links })
                }
            }
        }
    }))
}
