//! Duplex session WebSocket handler
//!
//! One socket per browser tab. The socket is bound to the session keyed by the
//! request's network origin; its own connection id is announced in `hello` and
//! aliased to that session so stateless calls can echo it back.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::asr::{AsrProxy, Transcript, TranscriptCallback, profile_for};
use crate::core::confirm::{Decision, REPROMPT_SENTENCE, parse_yes_no, send_and_settle};
use crate::core::conversation::{Event, OutboundEvent};
use crate::core::payments::PaymentService;
use crate::core::session::{ChannelSink, EventSink, Session, SharedSink};
use crate::handlers::peer::transport_key;
use crate::state::AppState;

use super::messages::{ClientFrame, MAX_CONTROL_FRAME_SIZE};

/// Maximum WebSocket frame size (1 MB); audio arrives in small PCM chunks
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Duplex session WebSocket handler
///
/// Upgrades `GET /ws/session`. The first message on the socket is
/// `{"type":"hello","sessionId":...,"ts":...}`.
pub async fn session_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let key = transport_key(&headers, peer, state.config.trust_forwarded_headers);
    debug!(session = %key, "Session WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_session_socket(socket, state, key))
}

/// Per-connection resources the inbound loop works with.
struct Connection {
    id: Uuid,
    session: Arc<Session>,
    sink: ChannelSink,
    asr: Option<AsrProxy>,
}

async fn handle_session_socket(socket: WebSocket, state: Arc<AppState>, key: String) {
    let id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (sink, mut events_rx) = ChannelSink::channel();

    // Writer task: everything for this socket goes through the channel, so
    // session events, replies and broadcasts keep one order.
    let writer_task = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // hello goes out before any backlog the session flushes on attach.
    let _ = sink.deliver(&OutboundEvent::hello(id.to_string()));

    let shared: SharedSink = Arc::new(sink.clone());
    let session = state.registry.resolve(&key, Some(shared.clone()));
    state.registry.alias(&id.to_string(), &session);
    state.hub.register(id, sink.clone());

    info!(
        session = %key,
        connection = %id,
        state = %session.state(),
        "Session WebSocket connected"
    );

    let asr = start_transcription(&state, &session);
    let mut connection = Connection {
        id,
        session,
        sink,
        asr,
    };

    while let Some(message) = receiver.next().await {
        match message {
            Ok(message) => {
                if !process_message(message, &connection, &state) {
                    break;
                }
            }
            Err(e) => {
                warn!(connection = %id, "Session WebSocket error: {}", e);
                break;
            }
        }
    }

    // Cleanup. The session and its backlog stay for a reconnect.
    connection.session.detach_sink(&shared);
    state.hub.remove(&id);
    if let Some(asr) = connection.asr.take() {
        asr.shutdown().await;
    }
    writer_task.abort();

    info!(session = %key, connection = %id, "Session WebSocket disconnected");
}

/// Open the transcription relay for this connection when streaming is enabled.
fn start_transcription(state: &AppState, session: &Arc<Session>) -> Option<AsrProxy> {
    if !state.config.asr.enabled {
        return None;
    }

    match profile_for(&state.config.asr) {
        Ok(profile) => Some(AsrProxy::connect(
            profile,
            transcript_callback(session.clone(), state.payments.clone()),
        )),
        Err(e) => {
            error!(session = %session.key(), "Transcription relay unavailable: {}", e);
            None
        }
    }
}

/// Relay transcripts to the client; finals also drive the conversation.
fn transcript_callback(
    session: Arc<Session>,
    payments: Arc<dyn PaymentService>,
) -> TranscriptCallback {
    Arc::new(move |transcript: Transcript| {
        session.emit(transcript.to_outbound());
        if transcript.is_final {
            send_and_settle(
                &session,
                &payments,
                Event::TranscriptFinal {
                    text: transcript.text,
                },
            );
        }
    })
}

/// Handle one inbound message. Returns false when the socket should close.
fn process_message(message: Message, connection: &Connection, state: &Arc<AppState>) -> bool {
    match message {
        Message::Text(text) => {
            if text.len() > MAX_CONTROL_FRAME_SIZE {
                warn!(
                    connection = %connection.id,
                    size = text.len(),
                    "Dropping oversized control frame"
                );
                return true;
            }
            match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => handle_frame(frame, connection, state),
                Err(e) => {
                    debug!(connection = %connection.id, "Ignoring unrecognized frame: {}", e)
                }
            }
            true
        }
        Message::Binary(data) => {
            forward_audio(connection, data);
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(connection = %connection.id, "Session WebSocket close received");
            false
        }
    }
}

fn forward_audio(connection: &Connection, data: Bytes) {
    match &connection.asr {
        Some(asr) => {
            if !asr.handle_frame(data) {
                debug!(connection = %connection.id, "Transcription relay closed, dropping audio");
            }
        }
        None => {
            debug!(connection = %connection.id, "Streaming transcription off, ignoring audio")
        }
    }
}

fn handle_frame(frame: ClientFrame, connection: &Connection, state: &Arc<AppState>) {
    match frame {
        ClientFrame::Ping => {
            let _ = connection.sink.deliver(&OutboundEvent::pong());
        }
        ClientFrame::VadInterrupt => {
            connection.session.send(Event::UserInterrupt);
            let reached = state.hub.broadcast(&OutboundEvent::PauseAudio);
            debug!(connection = %connection.id, reached, "pause_audio broadcast");
        }
        ClientFrame::Confirm { answer } => {
            handle_confirm(answer.as_deref(), connection, state);
        }
        other => {
            if let Some(event) = other.as_event() {
                send_and_settle(&connection.session, &state.payments, event);
            }
        }
    }
}

fn handle_confirm(answer: Option<&str>, connection: &Connection, state: &Arc<AppState>) {
    let event = match answer.and_then(parse_yes_no) {
        Some(Decision::Yes) => Event::ConfirmAccepted,
        Some(Decision::No) => Event::ConfirmRejected,
        None => {
            let _ = connection
                .sink
                .deliver(&OutboundEvent::speak(REPROMPT_SENTENCE));
            return;
        }
    };

    let dispatch = send_and_settle(&connection.session, &state.payments, event);
    if !dispatch.transitioned {
        debug!(
            connection = %connection.id,
            state = %dispatch.state,
            "Confirmation answer with nothing pending"
        );
    }
}
