//! Test doubles shared by session and handler tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::sink::{EventSink, SharedSink, SinkClosed};
use crate::core::conversation::OutboundEvent;

/// Sink that records everything it is handed.
pub struct RecordingSink {
    events: Mutex<Vec<OutboundEvent>>,
    open: AtomicBool,
    this: std::sync::Weak<RecordingSink>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            events: Mutex::new(Vec::new()),
            open: AtomicBool::new(true),
            this: this.clone(),
        })
    }

    pub fn shared(&self) -> SharedSink {
        self.this.upgrade().expect("sink alive") as SharedSink
    }

    pub fn events(&self) -> Vec<OutboundEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl EventSink for RecordingSink {
    fn deliver(&self, event: &OutboundEvent) -> Result<(), SinkClosed> {
        if !self.is_open() {
            return Err(SinkClosed);
        }
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
