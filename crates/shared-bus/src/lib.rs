//! # Meridian Chain - Shared Bus
//!
//! Typed in-process event bus connecting the chain, the miner, and any
//! other interested subsystem.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   mc-chain   │                    │   mc-miner   │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! The bus carries two event kinds: `ChainHead` (the canonical head
//! advanced) and `NewMined` (this node sealed and persisted a block).
//! A producer emits both, in that order, only after the block has been
//! durably written.

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{ChainEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events buffered per subscriber before older ones are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
