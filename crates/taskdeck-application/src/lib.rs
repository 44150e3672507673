//! Use-case layer for taskdeck: the optimistic mutation engine, the
//! [`SyncClient`] facade and periodic refresh.

pub mod client;
pub mod engine;
pub mod refresh;

pub use client::SyncClient;
pub use engine::{MutationHandle, MutationOutcome, OptimisticEngine, RefreshOutcome, StoreChange};
pub use refresh::RefreshScheduler;
