use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::core::conversation::OutboundEvent;
use crate::core::session::{ChannelSink, EventSink};

/// Every open duplex connection, for writes that are not scoped to one session.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    connections: DashMap<Uuid, ChannelSink>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: Uuid, sink: ChannelSink) {
        self.connections.insert(id, sink);
        debug!(connection = %id, open = self.connections.len(), "Connection registered");
    }

    pub fn remove(&self, id: &Uuid) {
        if self.connections.remove(id).is_some() {
            debug!(connection = %id, open = self.connections.len(), "Connection removed");
        }
    }

    /// Send `event` to every open connection. Returns how many accepted it.
    pub fn broadcast(&self, event: &OutboundEvent) -> usize {
        let mut delivered = 0;
        for entry in self.connections.iter() {
            if entry.value().deliver(event).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_open_connections_only() {
        let hub = ConnectionHub::new();
        let (a, mut rx_a) = ChannelSink::channel();
        let (b, mut rx_b) = ChannelSink::channel();
        let (c, rx_c) = ChannelSink::channel();
        hub.register(Uuid::new_v4(), a);
        hub.register(Uuid::new_v4(), b);
        hub.register(Uuid::new_v4(), c);
        drop(rx_c);

        assert_eq!(hub.broadcast(&OutboundEvent::PauseAudio), 2);
        assert_eq!(rx_a.try_recv().unwrap(), OutboundEvent::PauseAudio);
        assert_eq!(rx_b.try_recv().unwrap(), OutboundEvent::PauseAudio);
    }

    #[test]
    fn test_remove() {
        let hub = ConnectionHub::new();
        let id = Uuid::new_v4();
        let (sink, _rx) = ChannelSink::channel();
        hub.register(id, sink);
        assert_eq!(hub.len(), 1);

        hub.remove(&id);
        hub.remove(&id);
        assert!(hub.is_empty());
    }
}
