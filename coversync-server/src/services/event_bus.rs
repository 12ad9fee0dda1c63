use std::sync::atomic::{AtomicU64, Ordering};

use coversync_api::PositionChangeEvent;
use tokio::sync::{Mutex, mpsc};
use tokio::sync::mpsc::error::TrySendError;

pub const EVENT_BUS_CAPACITY: usize = 100;

/// Bounded queue of position changes between the actors and the live update broadcaster.
///
/// Producers never wait: when the queue is full the event is dropped and counted.
pub struct EventBus {
    sender: mpsc::Sender<PositionChangeEvent>,
    receiver: Mutex<Option<mpsc::Receiver<PositionChangeEvent>>>,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);

        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queues `event` without blocking, returns whether it was accepted.
    pub fn publish(&self, event: PositionChangeEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    actor = %event.actor_name,
                    position = event.position,
                    "Position change queue is full, dropping event"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(actor = %event.actor_name, "Position change queue has no consumer");
                false
            }
        }
    }

    /// Number of events lost so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Hands out the consuming end, only the first caller gets it.
    pub async fn take_receiver(&self) -> Option<mpsc::Receiver<PositionChangeEvent>> {
        self.receiver.lock().await.take()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(position: u8) -> PositionChangeEvent {
        PositionChangeEvent {
            actor_name: "Kitchen".to_string(),
            position,
            slat_position: 0,
        }
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.take_receiver().await.unwrap();

        assert!(bus.publish(event(42)));
        assert_eq!(receiver.recv().await, Some(event(42)));
        assert_eq!(bus.dropped(), 0);
    }

    #[tokio::test]
    async fn test_drop_when_full() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.take_receiver().await.unwrap();

        assert!(bus.publish(event(1)));
        assert!(bus.publish(event(2)));
        assert!(!bus.publish(event(3)));
        assert_eq!(bus.dropped(), 1);

        assert_eq!(receiver.recv().await, Some(event(1)));
        assert_eq!(receiver.recv().await, Some(event(2)));

        assert!(bus.publish(event(4)));
        assert_eq!(receiver.recv().await, Some(event(4)));
    }

    #[tokio::test]
    async fn test_receiver_is_taken_once() {
        let bus = EventBus::new();

        assert!(bus.take_receiver().await.is_some());
        assert!(bus.take_receiver().await.is_none());
    }
}
