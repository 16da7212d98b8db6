use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::conversation::OutboundEvent;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("event sink is closed")]
pub struct SinkClosed;

/// Output channel of a session.
///
/// `deliver` must not block. A sink that fails to deliver is treated as gone
/// and the event stays in the session backlog.
pub trait EventSink: Send + Sync {
    fn deliver(&self, event: &OutboundEvent) -> Result<(), SinkClosed>;

    fn is_open(&self) -> bool;
}

pub type SharedSink = Arc<dyn EventSink>;

/// Identity comparison for sinks, ignoring vtable metadata.
pub fn same_sink(a: &SharedSink, b: &SharedSink) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Sink that forwards events into an unbounded channel drained by a socket writer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, event: &OutboundEvent) -> Result<(), SinkClosed> {
        self.tx.send(event.clone()).map_err(|_| SinkClosed)
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}
