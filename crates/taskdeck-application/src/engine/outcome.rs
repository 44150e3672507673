use taskdeck_core::{EntityId, Operation, Result, SyncError};
use tokio::task::JoinHandle;

/// How a mutation attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The server accepted it; for creates `entity_id` is the persisted id.
    Confirmed { entity_id: EntityId },
    /// The optimistic change was reverted.
    RolledBack { entity_id: EntityId, reason: SyncError },
}

impl MutationOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn entity_id(&self) -> &EntityId {
        match self {
            Self::Confirmed { entity_id } | Self::RolledBack { entity_id, .. } => entity_id,
        }
    }

    pub fn into_result(self) -> Result<EntityId> {
        match self {
            Self::Confirmed { entity_id } => Ok(entity_id),
            Self::RolledBack { reason, .. } => Err(reason),
        }
    }
}

/// Returned as soon as a mutation has been applied locally (or queued behind
/// an earlier one on the same id). Dropping it does not cancel anything.
#[derive(Debug)]
pub struct MutationHandle {
    entity_id: EntityId,
    operation: Operation,
    join: JoinHandle<MutationOutcome>,
}

impl MutationHandle {
    pub(crate) fn new(entity_id: EntityId, operation: Operation, join: JoinHandle<MutationOutcome>) -> Self {
        Self {
            entity_id,
            operation,
            join,
        }
    }

    /// The id the mutation targets. For creates this is the temporary id.
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for confirmation or rollback.
    pub async fn outcome(self) -> MutationOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => MutationOutcome::RolledBack {
                entity_id: self.entity_id,
                reason: SyncError::internal(format!("mutation task failed: {e}")),
            },
        }
    }
}

/// Store-changed notifications used to drive re-rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Inserted { id: EntityId },
    Updated { id: EntityId },
    Removed { id: EntityId },
    /// Temporary id swapped for the persisted one.
    Replaced { old: EntityId, new: EntityId },
    RolledBack { id: EntityId },
    /// Contents replaced by an authoritative list.
    Reloaded { count: usize },
    Selected { id: Option<EntityId> },
}

/// Result of a full refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { count: usize },
    /// A mutation was in flight (or started during the fetch); the list was
    /// discarded and the store left alone.
    Deferred,
}
