//! Entity Store: the client-side mirror of one server collection.
//!
//! The store is an ordered sequence of entities, unique by id. Insertion order
//! is display order, except where a mutation explicitly inserts at the front.
//! It also carries the "currently open" selection pointer so that id swaps,
//! removals and rollbacks keep it consistent with the sequence.
//!
//! The store itself is not synchronized; the mutation engine owns it behind a
//! lock and funnels all writes through its per-id serialization.

mod snapshot;

pub use snapshot::Snapshot;

use crate::entity::{Entity, EntityId};
use crate::error::{Result, SyncError};

#[derive(Debug, Clone)]
pub struct EntityStore<E: Entity> {
    entries: Vec<E>,
    selected: Option<EntityId>,
    /// Bumped on every write. Not part of the snapshot state.
    revision: u64,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
            revision: 0,
        }
    }

    /// Adds `entity` first (`at_front`) or last in iteration order.
    ///
    /// # Errors
    ///
    /// `DuplicateId` if the id is already present; the store is left untouched.
    pub fn insert(&mut self, entity: E, at_front: bool) -> Result<()> {
        if self.contains(entity.id()) {
            return Err(SyncError::duplicate_id(E::KIND, entity.id().as_str()));
        }
        if at_front {
            self.entries.insert(0, entity);
        } else {
            self.entries.push(entity);
        }
        self.touch();
        Ok(())
    }

    /// Merges `patch` into the entity with `id`, keeping its position.
    pub fn update(&mut self, id: &EntityId, patch: &E::Patch) -> Result<()> {
        let entity = self
            .entries
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| SyncError::not_found(E::KIND, id.as_str()))?;
        entity.apply_patch(patch);
        self.touch();
        Ok(())
    }

    /// Deletes the entity with `id` and returns it. Clears the selection if it
    /// pointed at the removed entity.
    pub fn remove(&mut self, id: &EntityId) -> Result<E> {
        let position = self
            .position(id)
            .ok_or_else(|| SyncError::not_found(E::KIND, id.as_str()))?;
        let removed = self.entries.remove(position);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        self.touch();
        Ok(removed)
    }

    /// Swaps the entity at `old_id` for `entity`, in the same position.
    ///
    /// The selection follows the swap. This is the temp → persisted step of
    /// reconciliation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `old_id` is absent
    /// - `DuplicateId` if the new id already names a different entry
    pub fn replace_id(&mut self, old_id: &EntityId, entity: E) -> Result<()> {
        let position = self
            .position(old_id)
            .ok_or_else(|| SyncError::not_found(E::KIND, old_id.as_str()))?;
        if entity.id() != old_id && self.contains(entity.id()) {
            return Err(SyncError::duplicate_id(E::KIND, entity.id().as_str()));
        }
        if self.selected.as_ref() == Some(old_id) {
            self.selected = Some(entity.id().clone());
        }
        self.entries[position] = entity;
        self.touch();
        Ok(())
    }

    /// Deep copy of the current ordered sequence and selection.
    pub fn snapshot(&self) -> Snapshot<E> {
        Snapshot {
            entries: self.entries.clone(),
            selected: self.selected.clone(),
        }
    }

    /// Replaces the whole sequence (and selection) with `snapshot`.
    pub fn restore(&mut self, snapshot: Snapshot<E>) {
        self.entries = snapshot.entries;
        self.selected = snapshot.selected;
        self.touch();
    }

    /// Restores only the entity `id` to the state recorded in `snapshot`.
    ///
    /// - present in the snapshot and in the store: value restored in place
    /// - present in the snapshot only: re-inserted right after the nearest
    ///   preceding snapshot neighbour still in the store (or first)
    /// - absent from the snapshot: removed from the store
    ///
    /// Other entities are left exactly as they are. When nothing else changed
    /// since the snapshot the result equals [`restore`](Self::restore).
    pub fn restore_entity(&mut self, snapshot: &Snapshot<E>, id: &EntityId) {
        let Some(snapshot_position) = snapshot.position(id) else {
            if let Some(position) = self.position(id) {
                self.entries.remove(position);
                if self.selected.as_ref() == Some(id) {
                    self.selected = None;
                }
                self.touch();
            }
            return;
        };

        let original = snapshot.entries[snapshot_position].clone();
        if let Some(position) = self.position(id) {
            self.entries[position] = original;
        } else {
            let anchor = snapshot.entries[..snapshot_position]
                .iter()
                .rev()
                .find_map(|e| self.position(e.id()));
            let insert_at = anchor.map_or(0, |p| p + 1);
            self.entries.insert(insert_at, original);
        }

        if snapshot.selected.as_ref() == Some(id) && self.selected.is_none() {
            self.selected = Some(id.clone());
        }
        self.touch();
    }

    /// Replaces the contents with an authoritative list. The selection is
    /// kept when its id survives, cleared otherwise.
    pub fn replace_all(&mut self, entities: Vec<E>) {
        self.entries = entities;
        if let Some(selected) = self.selected.clone() {
            if !self.contains(&selected) {
                self.selected = None;
            }
        }
        self.touch();
    }

    /// Points the selection at `id`, or clears it with `None`.
    pub fn select(&mut self, id: Option<&EntityId>) -> Result<()> {
        match id {
            Some(id) if !self.contains(id) => Err(SyncError::not_found(E::KIND, id.as_str())),
            Some(id) => {
                self.selected = Some(id.clone());
                self.touch();
                Ok(())
            }
            None => {
                self.selected = None;
                self.touch();
                Ok(())
            }
        }
    }

    pub fn selected(&self) -> Option<&EntityId> {
        self.selected.as_ref()
    }

    pub fn find(&self, id: &EntityId) -> Option<&E> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Entities in display order.
    pub fn all(&self) -> &[E] {
        &self.entries
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.position(id).is_some()
    }

    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write counter, used to tell whether anything changed since a point in
    /// time.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
