//! Client-side synchronization core for taskdeck.
//!
//! Keeps a local mirror of server-owned collections (assistant conversations,
//! tasks), applies user edits optimistically and folds server truth back in.
//! This crate holds the domain pieces; the async mutation engine lives in
//! `taskdeck-application`.

pub mod config;
pub mod conversation;
pub mod entity;
pub mod error;
pub mod notify;
pub mod reconcile;
pub mod store;
pub mod task;
pub mod transport;

// Re-export common types
pub use config::SyncConfig;
pub use entity::{Entity, EntityId, EntityKind, IdentityAllocator};
pub use error::{Result, SyncError};
pub use notify::{MutationEvent, NotificationSink, Operation};
pub use reconcile::ServerShape;
pub use store::{EntityStore, Snapshot};
pub use transport::{Transport, UpdateAck};
