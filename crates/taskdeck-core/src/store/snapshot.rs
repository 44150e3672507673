use crate::entity::{Entity, EntityId};

/// An immutable copy of a store's ordered entities, taken before an
/// optimistic mutation and used only to roll it back.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<E: Entity> {
    pub(super) entries: Vec<E>,
    pub(super) selected: Option<EntityId>,
}

impl<E: Entity> Snapshot<E> {
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
