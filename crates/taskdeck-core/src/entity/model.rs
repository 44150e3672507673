//! Entity identity and the trait every synchronized kind implements.

use super::identity::TEMP_ID_PREFIX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The collections mirrored by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Assistant chat conversations.
    Conversation,
    /// Tasks on the task list/board.
    Task,
}

impl EntityKind {
    /// Stable lowercase name, used in logs and notifications.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Conversation => "conversation",
            EntityKind::Task => "task",
        }
    }

    /// Collection segment of the remote API path.
    pub fn collection(&self) -> &'static str {
        match self {
            EntityKind::Conversation => "conversations",
            EntityKind::Task => "tasks",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of an entity, either temporary (locally allocated) or persisted
/// (server assigned, opaque).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True until the id has been swapped for a server-assigned one.
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A domain entity mirrored in an [`EntityStore`](crate::store::EntityStore).
///
/// The store and the mutation engine are generic over this trait; each kind
/// only describes its create fields (`Draft`), its partial update (`Patch`)
/// and how a patch is merged into the entity.
pub trait Entity: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Fields supplied by the user when creating a new entity.
    type Draft: Clone + fmt::Debug + Send + Sync + 'static;
    /// A partial update of the entity's fields.
    type Patch: Clone + fmt::Debug + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &EntityId;

    /// Builds the optimistic local entity shown before the server answers.
    fn from_draft(id: EntityId, draft: &Self::Draft) -> Self;

    /// Merges `patch` into the entity's fields. Never changes the id.
    fn apply_patch(&mut self, patch: &Self::Patch);

    fn is_temporary(&self) -> bool {
        self.id().is_temporary()
    }
}
