//! Remote transport trait.
//!
//! Defines the contract the mutation engine uses to reach the server.

use crate::entity::EntityId;
use crate::error::Result;
use crate::reconcile::ServerShape;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Server acknowledgment of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAck {
    /// Missing from the response counts as not acknowledged.
    #[serde(default)]
    pub success: bool,
}

impl UpdateAck {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn rejected() -> Self {
        Self { success: false }
    }
}

/// An abstract transport for one entity kind.
///
/// This trait decouples the synchronization core from the concrete binding
/// (REST over HTTP, an in-memory fake, ...). Payloads go out already in server
/// shape and records come back in server shape; the reconciliation layer owns
/// both conversions.
///
/// # Implementation Notes
///
/// - A call that never resolves leaves the target permanently pending;
///   bindings should enforce a timeout and surface it as `SyncError::Transport`.
/// - Calls are never cancelled once issued.
#[async_trait]
pub trait Transport<E: ServerShape>: Send + Sync {
    /// Creates an entity from its persistable fields.
    ///
    /// # Returns
    ///
    /// - `Ok(record)`: the server-confirmed entity, carrying its persisted id
    /// - `Err(_)`: transport or server failure
    async fn create_entity(&self, fields: JsonValue) -> Result<E::Record>;

    /// Sends a partial update for a persisted entity.
    ///
    /// # Returns
    ///
    /// - `Ok(ack)`: the server answered; `ack.success` tells whether it applied
    /// - `Err(_)`: transport or server failure
    async fn update_entity(&self, id: &EntityId, patch: JsonValue) -> Result<UpdateAck>;

    /// Deletes a persisted entity.
    async fn delete_entity(&self, id: &EntityId) -> Result<()>;

    /// Lists the authoritative collection.
    async fn list_entities(&self) -> Result<Vec<E::Record>>;
}

#[async_trait]
impl<E, T> Transport<E> for Arc<T>
where
    E: ServerShape,
    T: Transport<E> + ?Sized,
{
    async fn create_entity(&self, fields: JsonValue) -> Result<E::Record> {
        (**self).create_entity(fields).await
    }

    async fn update_entity(&self, id: &EntityId, patch: JsonValue) -> Result<UpdateAck> {
        (**self).update_entity(id, patch).await
    }

    async fn delete_entity(&self, id: &EntityId) -> Result<()> {
        (**self).delete_entity(id).await
    }

    async fn list_entities(&self) -> Result<Vec<E::Record>> {
        (**self).list_entities().await
    }
}
