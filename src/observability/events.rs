use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::engine::SourceState;

/// Discrete status notifications published by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    ConnectionLost,
    ConnectionRestored,
    CorruptPacket { expected: u16, received: u16 },
    StalePacket,
    PacketTimeout { elapsed_ms: u64 },
    StateChanged { state: SourceState },
}

/// Fan-out of events to any number of subscribers. Publishing never blocks;
/// subscribers that dropped their receiver are pruned.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<SourceEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<SourceEvent> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(tx);
        rx
    }

    pub fn publish(&self, event: SourceEvent) {
        let mut subscribers = self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(SourceEvent::ConnectionLost);
        assert_eq!(a.try_recv().unwrap(), SourceEvent::ConnectionLost);
        assert_eq!(b.try_recv().unwrap(), SourceEvent::ConnectionLost);
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        bus.publish(SourceEvent::StalePacket);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(keep.try_recv().unwrap(), SourceEvent::StalePacket);
    }
}
