//! Reconciliation Layer.
//!
//! Folds server-authoritative data back into an [`EntityStore`]:
//!
//! - [`reconcile_create`]: temp → persisted id swap, in place
//! - [`reconcile_list`]: wholesale replacement after a full refetch
//!
//! It is also the only place where server field names and casing are mapped
//! to and from the canonical client shape ([`ServerShape`]). The `conversation`
//! and `task` submodules hold those mappings.

mod conversation;
mod task;

pub use conversation::{ConversationRecord, MessageRecord};
pub use task::TaskRecord;

use crate::entity::{Entity, EntityId};
use crate::error::{Result, SyncError};
use crate::store::EntityStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fmt;

/// Mapping between an entity's canonical shape and its server representation.
pub trait ServerShape: Entity {
    /// The record as the server sends it.
    type Record: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static;

    /// Normalizes a server record into the canonical entity.
    fn from_record(record: Self::Record) -> Result<Self>;

    /// Persistable create fields, in server shape.
    fn draft_payload(draft: &Self::Draft) -> Result<JsonValue>;

    /// Update fields, in server shape.
    fn patch_payload(patch: &Self::Patch) -> Result<JsonValue>;
}

/// Replaces the temporary entity `temp_id` with the server-confirmed one.
///
/// The confirmed entity takes the temporary entity's position and the
/// selection follows it. Returns the persisted id.
///
/// # Errors
///
/// - `Serialization` if the record cannot be normalized or carries a
///   temporary id
/// - `NotFound` / `DuplicateId` from the store swap
pub fn reconcile_create<E: ServerShape>(
    store: &mut EntityStore<E>,
    temp_id: &EntityId,
    record: E::Record,
) -> Result<EntityId> {
    let entity = E::from_record(record)?;
    let persisted_id = entity.id().clone();
    if persisted_id.is_temporary() {
        return Err(SyncError::serialization(
            E::KIND.as_str(),
            format!("server returned reserved id '{persisted_id}'"),
        ));
    }
    store.replace_id(temp_id, entity)?;
    tracing::debug!(
        target: "sync",
        kind = %E::KIND,
        temp_id = %temp_id,
        id = %persisted_id,
        "reconciled create"
    );
    Ok(persisted_id)
}

/// Replaces the store contents with the authoritative server list.
///
/// All records are normalized first; if any fails, the store is left
/// untouched. Records with a duplicate or reserved id are dropped with a
/// warning. Returns the number of entities now in the store.
///
/// Callers must only apply this between mutations.
pub fn reconcile_list<E: ServerShape>(
    store: &mut EntityStore<E>,
    records: Vec<E::Record>,
) -> Result<usize> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut entities = Vec::with_capacity(records.len());
    for record in records {
        let entity = E::from_record(record)?;
        if entity.id().is_temporary() {
            tracing::warn!(target: "sync", kind = %E::KIND, id = %entity.id(), "dropping server record with reserved id");
            continue;
        }
        if !seen.insert(entity.id().clone()) {
            tracing::warn!(target: "sync", kind = %E::KIND, id = %entity.id(), "dropping duplicate server record");
            continue;
        }
        entities.push(entity);
    }
    let count = entities.len();
    store.replace_all(entities);
    Ok(count)
}
