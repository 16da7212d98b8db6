use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::profile::{Transcript, TranscriptionProfile};

/// Invoked for every normalised transcript, in upstream order. Runs on the
/// connection task, so it must not block.
pub type TranscriptCallback = Arc<dyn Fn(Transcript) + Send + Sync>;

/// How long the upstream gets to complete its WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Local view of the upstream socket.
enum Link {
    /// Upstream not open yet. Frames wait here in arrival order.
    Connecting { pending: VecDeque<Bytes> },
    /// Upstream open. Frames go straight to the connection task.
    Ready { tx: mpsc::UnboundedSender<Bytes> },
    /// Upstream failed or closed. Frames are dropped.
    Closed,
}

/// Relay from one client's audio to one upstream transcription socket.
///
/// Upstream failures never propagate to the caller: the proxy just stops
/// forwarding. There is no reconnect.
pub struct AsrProxy {
    provider: &'static str,
    link: Arc<Mutex<Link>>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    connection_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AsrProxy {
    /// Start connecting upstream in the background. Must be called inside a
    /// Tokio runtime.
    pub fn connect(profile: Box<dyn TranscriptionProfile>, on_transcript: TranscriptCallback) -> Self {
        Self::connect_with_timeout(profile, on_transcript, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Like [`AsrProxy::connect`], giving up on the upstream after `connect_timeout`.
    pub fn connect_with_timeout(
        profile: Box<dyn TranscriptionProfile>,
        on_transcript: TranscriptCallback,
        connect_timeout: Duration,
    ) -> Self {
        let provider = profile.name();
        let link = Arc::new(Mutex::new(Link::Connecting {
            pending: VecDeque::new(),
        }));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(run_connection(
            Arc::from(profile),
            link.clone(),
            on_transcript,
            connect_timeout,
            shutdown_rx,
        ));

        Self {
            provider,
            link,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            connection_handle: Mutex::new(Some(handle)),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    /// Accept one PCM frame from the client. Returns false when the frame was
    /// dropped because the upstream is gone.
    pub fn handle_frame(&self, frame: Bytes) -> bool {
        let mut link = self.link.lock();
        let sent = match &mut *link {
            Link::Connecting { pending } => {
                pending.push_back(frame);
                return true;
            }
            Link::Ready { tx } => tx.send(frame).is_ok(),
            Link::Closed => return false,
        };
        if !sent {
            *link = Link::Closed;
        }
        sent
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.link.lock(), Link::Ready { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.link.lock(), Link::Closed)
    }

    /// Frames waiting for the upstream to open.
    pub fn pending_frames(&self) -> usize {
        match &*self.link.lock() {
            Link::Connecting { pending } => pending.len(),
            _ => 0,
        }
    }

    /// Close the upstream socket. Safe to call more than once.
    pub fn close(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }
    }

    /// Close and wait for the connection task to finish.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.connection_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for AsrProxy {
    fn drop(&mut self) {
        self.close();
    }
}

fn mark_closed(link: &Mutex<Link>, provider: &str) {
    let mut link = link.lock();
    if let Link::Connecting { pending } = &*link
        && !pending.is_empty()
    {
        warn!(provider, dropped = pending.len(), "Dropping audio queued for closed upstream");
    }
    *link = Link::Closed;
}

async fn run_connection(
    profile: Arc<dyn TranscriptionProfile>,
    link: Arc<Mutex<Link>>,
    on_transcript: TranscriptCallback,
    connect_timeout: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let provider = profile.name();

    let request = match profile.request() {
        Ok(request) => request,
        Err(e) => {
            error!(provider, "Failed to build transcription request: {}", e);
            mark_closed(&link, provider);
            return;
        }
    };

    info!(provider, uri = %request.uri(), "Connecting to transcription provider");

    let connected = tokio::select! {
        result = tokio::time::timeout(connect_timeout, connect_async(request)) => result,
        _ = &mut shutdown_rx => {
            debug!(provider, "Transcription relay closed before upstream opened");
            mark_closed(&link, provider);
            return;
        }
    };

    let (ws_stream, _response) = match connected {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            error!(provider, "Transcription upstream connection failed: {}", e);
            mark_closed(&link, provider);
            return;
        }
        Err(_) => {
            error!(
                provider,
                timeout_ms = connect_timeout.as_millis() as u64,
                "Transcription upstream did not open in time"
            );
            mark_closed(&link, provider);
            return;
        }
    };

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    if let Some(handshake) = profile.handshake()
        && let Err(e) = ws_sink.send(Message::Text(handshake.into())).await
    {
        error!(provider, "Failed to send transcription handshake: {}", e);
        mark_closed(&link, provider);
        return;
    }

    // Swap the local queue for the live channel under the lock, so frames
    // arriving now line up behind the queued ones.
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Bytes>();
    let flushed = {
        let mut guard = link.lock();
        let pending = match std::mem::replace(&mut *guard, Link::Closed) {
            Link::Connecting { pending } => pending,
            Link::Ready { .. } | Link::Closed => VecDeque::new(),
        };
        let flushed = pending.len();
        for frame in pending {
            let _ = frame_tx.send(frame);
        }
        *guard = Link::Ready { tx: frame_tx };
        flushed
    };

    info!(provider, flushed, "Transcription upstream ready");

    loop {
        tokio::select! {
            Some(frame) = frame_rx.recv() => {
                let message = match profile.encode_frame(frame) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(provider, "Dropping audio frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = ws_sink.send(message).await {
                    error!(provider, "Failed to send audio upstream: {}", e);
                    break;
                }
            }

            message = ws_stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        for transcript in profile.decode(&text) {
                            on_transcript(transcript);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(provider, ?frame, "Transcription upstream closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(provider, "Transcription upstream error: {}", e);
                        break;
                    }
                    None => {
                        info!(provider, "Transcription upstream stream ended");
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!(provider, "Closing transcription upstream");
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    mark_closed(&link, provider);
}
