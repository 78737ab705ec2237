//! Event types carried by the bus.

use shared_types::Block;
use std::sync::Arc;

/// Events observable on the shared bus.
///
/// Blocks are wrapped in `Arc` so fan-out to many subscribers does not
/// clone transaction lists.
#[derive(Clone, Debug)]
pub enum ChainEvent {
    /// The canonical chain head advanced to this block.
    ChainHead(Arc<Block>),

    /// This node produced, sealed, and persisted this block.
    NewMined(Arc<Block>),
}

impl ChainEvent {
    /// The topic this event belongs to.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ChainHead(_) => EventTopic::ChainHead,
            Self::NewMined(_) => EventTopic::NewMined,
        }
    }
}

/// Subscription topics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventTopic {
    /// Head-of-chain announcements.
    ChainHead,
    /// Locally mined block announcements.
    NewMined,
}

/// Filter applied to a subscription.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    topics: Option<Vec<EventTopic>>,
}

impl EventFilter {
    /// Match every event.
    pub fn all() -> Self {
        Self { topics: None }
    }

    /// Match only the given topics.
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics: Some(topics),
        }
    }

    /// Whether `event` passes this filter.
    pub fn matches(&self, event: &ChainEvent) -> bool {
        match &self.topics {
            None => true,
            Some(topics) => topics.contains(&event.topic()),
        }
    }
}
