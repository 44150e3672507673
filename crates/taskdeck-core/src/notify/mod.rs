//! Notification Fan-out.
//!
//! Every mutation attempt ends in exactly one [`MutationEvent`] handed to a
//! [`NotificationSink`]. What the UI does with it (toast, badge, nothing) is
//! up to the sink. Presentation-level debouncing lives in
//! [`ThrottledSink`], never in the engine.

mod throttle;

pub use throttle::{NotificationThrottle, ThrottledSink};

use crate::entity::{EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// The mutation protocol being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Terminal result of a mutation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Success,
    Failure,
}

/// A user-facing success/failure signal.
///
/// For a confirmed create, `entity_id` is the persisted id; for anything
/// that failed it is the id the caller targeted (the temporary id for a
/// failed create).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEvent {
    pub kind: EventKind,
    pub entity_kind: EntityKind,
    pub entity_id: EntityId,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Whether retrying may succeed (remote failures only).
    #[serde(default)]
    pub retryable: bool,
}

impl MutationEvent {
    pub fn success(entity_kind: EntityKind, entity_id: EntityId, operation: Operation) -> Self {
        Self {
            kind: EventKind::Success,
            entity_kind,
            entity_id,
            operation,
            reason: None,
            retryable: false,
        }
    }

    pub fn failure(
        entity_kind: EntityKind,
        entity_id: EntityId,
        operation: Operation,
        reason: &crate::error::SyncError,
    ) -> Self {
        Self {
            kind: EventKind::Failure,
            entity_kind,
            entity_id,
            operation,
            reason: Some(reason.to_string()),
            retryable: reason.is_retryable(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == EventKind::Success
    }
}

/// Receiver of terminal mutation events.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: &MutationEvent);
}

/// Forwards events to the UI over an unbounded channel.
///
/// A dropped receiver is not an error; events are discarded.
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<MutationEvent>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<MutationEvent>) -> Self {
        Self { sender }
    }

    /// Creates a sink together with the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MutationEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, event: &MutationEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &MutationEvent) {
        match event.kind {
            EventKind::Success => tracing::info!(
                target: "sync",
                kind = %event.entity_kind,
                id = %event.entity_id,
                operation = %event.operation,
                "mutation confirmed"
            ),
            EventKind::Failure => tracing::warn!(
                target: "sync",
                kind = %event.entity_kind,
                id = %event.entity_id,
                operation = %event.operation,
                reason = event.reason.as_deref().unwrap_or(""),
                retryable = event.retryable,
                "mutation failed"
            ),
        }
    }
}

/// Fans one event out to several sinks, in order.
#[derive(Default)]
pub struct FanOut {
    sinks: Vec<std::sync::Arc<dyn NotificationSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: std::sync::Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl NotificationSink for FanOut {
    fn notify(&self, event: &MutationEvent) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}
