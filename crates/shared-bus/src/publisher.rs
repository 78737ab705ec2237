//! The publishing side of the event bus.

use crate::events::{ChainEvent, EventFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Trait for publishing events to the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns the number of subscribers reached.
    async fn publish(&self, event: ChainEvent) -> usize;

    /// Total events published over the bus lifetime.
    fn events_published(&self) -> u64;
}

/// In-memory event bus over `tokio::sync::broadcast`.
///
/// Suitable for single-node operation: every subscriber sees every
/// event, subject to its channel capacity. A lagging subscriber skips
/// the oldest events rather than blocking publishers.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<ChainEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Create a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit per-subscriber capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter, "[shared-bus] new subscription");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// The per-subscriber channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ChainEvent) -> usize {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(?topic, receivers, "[shared-bus] event published");
                receivers
            }
            Err(_) => {
                // No receivers; the event is dropped.
                debug!(?topic, "[shared-bus] event dropped (no receivers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTopic;
    use shared_types::Block;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_publish_no_subscribers() {
        let bus = InMemoryEventBus::new();
        let reached = bus
            .publish(ChainEvent::ChainHead(Arc::new(Block::default())))
            .await;
        assert_eq!(reached, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        let reached = bus
            .publish(ChainEvent::NewMined(Arc::new(Block::default())))
            .await;
        assert_eq!(reached, 1);

        let received = sub.recv().await.expect("event expected");
        assert_eq!(received.topic(), EventTopic::NewMined);
    }

    #[tokio::test]
    async fn test_filtered_subscriber_skips_other_topics() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::NewMined]));

        bus.publish(ChainEvent::ChainHead(Arc::new(Block::default())))
            .await;
        bus.publish(ChainEvent::NewMined(Arc::new(Block::default())))
            .await;

        let received = sub.recv().await.expect("event expected");
        assert_eq!(received.topic(), EventTopic::NewMined);
    }
}
