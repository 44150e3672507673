//! Optimistic Mutation Engine.
//!
//! `OptimisticEngine` owns the [`EntityStore`] of one entity kind and runs the
//! create/update/delete protocol against it:
//!
//! 1. **Applying**: snapshot taken, store mutated synchronously
//! 2. **Pending**: remote call in flight on a spawned task
//! 3. **Confirmed** (server truth reconciled) or **RolledBack** (snapshot
//!    restored), followed by exactly one notification
//!
//! Mutations on the same id are serialized through per-id lanes; mutations
//! on different ids run concurrently. Every entry point returns right after
//! the optimistic apply with a [`MutationHandle`] for the eventual outcome.
//! Entry points spawn onto the ambient tokio runtime and must be called from
//! within one.

mod lanes;
mod outcome;

pub use outcome::{MutationHandle, MutationOutcome, RefreshOutcome, StoreChange};

use lanes::{LaneTable, Ticket};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use taskdeck_core::reconcile::{reconcile_create, reconcile_list};
use taskdeck_core::{
    EntityId, EntityStore, IdentityAllocator, MutationEvent, NotificationSink, Operation, Result,
    ServerShape, Snapshot, SyncError, Transport,
};
use tokio::sync::broadcast;

const DEFAULT_CHANGE_BUFFER: usize = 256;

enum PendingOp<E: ServerShape> {
    Update { patch: E::Patch, payload: JsonValue },
    Delete,
}

impl<E: ServerShape> PendingOp<E> {
    fn operation(&self) -> Operation {
        match self {
            PendingOp::Update { .. } => Operation::Update,
            PendingOp::Delete => Operation::Delete,
        }
    }
}

/// What rollback needs from the apply step.
struct Applied<E: ServerShape> {
    snapshot: Snapshot<E>,
    /// Store revision right after the optimistic apply.
    revision: u64,
}

/// The create/update/delete protocol with optimistic apply and rollback for
/// one entity kind. Cloning is cheap and shares the same store.
pub struct OptimisticEngine<E: ServerShape> {
    inner: Arc<EngineInner<E>>,
}

impl<E: ServerShape> Clone for OptimisticEngine<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<E: ServerShape> {
    store: RwLock<EntityStore<E>>,
    transport: Arc<dyn Transport<E>>,
    allocator: Arc<IdentityAllocator>,
    notifier: Arc<dyn NotificationSink>,
    lanes: LaneTable,
    /// Mutations between begin and settlement, queued ones included.
    in_flight: AtomicUsize,
    /// Number of mutations ever started.
    epoch: AtomicU64,
    changes: broadcast::Sender<StoreChange>,
}

impl<E: ServerShape> OptimisticEngine<E> {
    /// Creates an engine with an empty store and its own id allocator.
    pub fn new(transport: Arc<dyn Transport<E>>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self::with_allocator(
            transport,
            notifier,
            Arc::new(IdentityAllocator::new()),
            DEFAULT_CHANGE_BUFFER,
        )
    }

    /// Creates an engine sharing `allocator` with other engines.
    ///
    /// # Arguments
    ///
    /// * `change_buffer` - Capacity of the store-change channel; slow
    ///   subscribers past it observe `Lagged`
    pub fn with_allocator(
        transport: Arc<dyn Transport<E>>,
        notifier: Arc<dyn NotificationSink>,
        allocator: Arc<IdentityAllocator>,
        change_buffer: usize,
    ) -> Self {
        let (changes, _) = broadcast::channel(change_buffer.max(1));
        Self {
            inner: Arc::new(EngineInner {
                store: RwLock::new(EntityStore::new()),
                transport,
                allocator,
                notifier,
                lanes: LaneTable::default(),
                in_flight: AtomicUsize::new(0),
                epoch: AtomicU64::new(0),
                changes,
            }),
        }
    }

    // ============================================================================
    // Read accessors
    // ============================================================================

    /// All entities in display order.
    pub fn get_all(&self) -> Vec<E> {
        self.inner
            .read_store()
            .map(|store| store.all().to_vec())
            .unwrap_or_default()
    }

    pub fn get_by_id(&self, id: &EntityId) -> Option<E> {
        self.inner
            .read_store()
            .ok()
            .and_then(|store| store.find(id).cloned())
    }

    /// A deep copy of the current store state.
    pub fn snapshot(&self) -> Result<Snapshot<E>> {
        Ok(self.inner.read_store()?.snapshot())
    }

    /// The "currently open" entity, if any.
    pub fn selected(&self) -> Option<EntityId> {
        self.inner
            .read_store()
            .ok()
            .and_then(|store| store.selected().cloned())
    }

    /// Points the selection at `id` (or clears it). The pointer follows id
    /// swaps and is cleared when its entity is removed.
    pub fn select(&self, id: Option<&EntityId>) -> Result<()> {
        self.inner.write_store()?.select(id)?;
        self.inner.publish(StoreChange::Selected { id: id.cloned() });
        Ok(())
    }

    /// Subscribes to store changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.inner.changes.subscribe()
    }

    /// Number of mutations that have not settled yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// True while a mutation on `id` has not settled. A temporary id is
    /// pending for as long as it is in the store.
    pub fn is_pending(&self, id: &EntityId) -> bool {
        if self.inner.lanes.contains(id) {
            return true;
        }
        id.is_temporary()
            && self
                .inner
                .read_store()
                .map(|store| store.contains(id))
                .unwrap_or(false)
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    /// Inserts an entity under a fresh temporary id and asks the server to
    /// create it.
    ///
    /// On confirmation the temporary entity is swapped in place for the
    /// server's; on failure it is removed. The handle's `entity_id` is the
    /// temporary id.
    pub fn create_optimistic(&self, draft: E::Draft, at_front: bool) -> Result<MutationHandle> {
        let inner = &self.inner;
        let temp_id = inner.allocator.allocate();

        let payload = match E::draft_payload(&draft) {
            Ok(payload) => payload,
            Err(reason) => {
                inner.emit_failure(&temp_id, Operation::Create, &reason);
                return Err(reason);
            }
        };

        inner.begin_mutation();
        let entity = E::from_draft(temp_id.clone(), &draft);
        if let Err(reason) = inner
            .write_store()
            .and_then(|mut store| store.insert(entity, at_front))
        {
            inner.end_mutation();
            tracing::error!(target: "sync", kind = %E::KIND, id = %temp_id, "optimistic insert failed: {}", reason);
            inner.emit_failure(&temp_id, Operation::Create, &reason);
            return Err(reason);
        }
        inner.publish(StoreChange::Inserted { id: temp_id.clone() });
        tracing::debug!(target: "sync", kind = %E::KIND, id = %temp_id, at_front, "create applied");

        let task_inner = Arc::clone(inner);
        let id = temp_id.clone();
        let join = tokio::spawn(async move {
            let result = task_inner.transport.create_entity(payload).await;
            task_inner.settle_create(&id, result)
        });

        Ok(MutationHandle::new(temp_id, Operation::Create, join))
    }

    /// Merges `patch` into a persisted entity and sends it to the server.
    ///
    /// # Errors
    ///
    /// Rejected synchronously, before any remote call:
    /// - `InvalidTarget` if `id` is still temporary
    /// - `NotFound` if `id` is not in the store
    pub fn update_optimistic(&self, id: &EntityId, patch: E::Patch) -> Result<MutationHandle> {
        let payload = match E::patch_payload(&patch) {
            Ok(payload) => payload,
            Err(reason) => {
                self.inner.emit_failure(id, Operation::Update, &reason);
                return Err(reason);
            }
        };
        self.inner.begin_targeted(id, PendingOp::Update { patch, payload })
    }

    /// Removes a persisted entity and asks the server to delete it. On
    /// failure the entity comes back at its original position.
    pub fn delete_optimistic(&self, id: &EntityId) -> Result<MutationHandle> {
        self.inner.begin_targeted(id, PendingOp::Delete)
    }

    // ============================================================================
    // Reconciliation
    // ============================================================================

    /// Refetches the collection and replaces the store with it, unless a
    /// mutation is in flight or one started while the fetch was running.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let records = self.inner.transport.list_entities().await?;
        self.inner.apply_list(Some(epoch), records)
    }

    /// Replaces the store with `records` if no mutation is in flight.
    pub fn reconcile_list(&self, records: Vec<E::Record>) -> Result<RefreshOutcome> {
        self.inner.apply_list(None, records)
    }
}

impl<E: ServerShape> EngineInner<E> {
    fn read_store(&self) -> Result<RwLockReadGuard<'_, EntityStore<E>>> {
        self.store
            .read()
            .map_err(|_| SyncError::internal("entity store lock poisoned"))
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, EntityStore<E>>> {
        self.store
            .write()
            .map_err(|_| SyncError::internal("entity store lock poisoned"))
    }

    fn publish(&self, change: StoreChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    fn begin_mutation(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    fn end_mutation(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn emit_failure(&self, id: &EntityId, operation: Operation, reason: &SyncError) {
        self.notifier
            .notify(&MutationEvent::failure(E::KIND, id.clone(), operation, reason));
    }

    fn emit(&self, outcome: &MutationOutcome, operation: Operation) {
        match outcome {
            MutationOutcome::Confirmed { entity_id } => {
                tracing::info!(target: "sync", kind = %E::KIND, id = %entity_id, %operation, "confirmed");
                self.notifier
                    .notify(&MutationEvent::success(E::KIND, entity_id.clone(), operation));
            }
            MutationOutcome::RolledBack { entity_id, reason } => {
                self.emit_failure(entity_id, operation, reason);
            }
        }
    }

    fn settle_create(&self, temp_id: &EntityId, result: Result<E::Record>) -> MutationOutcome {
        let outcome = match result.and_then(|record| {
            let mut store = self.write_store()?;
            reconcile_create(&mut store, temp_id, record)
        }) {
            Ok(persisted_id) => {
                self.publish(StoreChange::Replaced {
                    old: temp_id.clone(),
                    new: persisted_id.clone(),
                });
                MutationOutcome::Confirmed {
                    entity_id: persisted_id,
                }
            }
            Err(reason) => {
                if reason.is_duplicate_id() {
                    tracing::error!(target: "sync", kind = %E::KIND, id = %temp_id, "create reconciliation collided: {}", reason);
                } else {
                    tracing::warn!(target: "sync", kind = %E::KIND, id = %temp_id, "create failed, removing temporary entity: {}", reason);
                }
                self.discard_temporary(temp_id);
                MutationOutcome::RolledBack {
                    entity_id: temp_id.clone(),
                    reason,
                }
            }
        };
        self.end_mutation();
        self.emit(&outcome, Operation::Create);
        outcome
    }

    fn discard_temporary(&self, temp_id: &EntityId) {
        match self.write_store() {
            Ok(mut store) => {
                if store.remove(temp_id).is_ok() {
                    drop(store);
                    self.publish(StoreChange::Removed { id: temp_id.clone() });
                }
            }
            Err(e) => tracing::error!(target: "sync", id = %temp_id, "cannot remove temporary entity: {}", e),
        }
    }

    fn begin_targeted(self: &Arc<Self>, id: &EntityId, op: PendingOp<E>) -> Result<MutationHandle> {
        let operation = op.operation();
        if id.is_temporary() {
            let reason = SyncError::invalid_target(E::KIND, id.as_str());
            tracing::debug!(target: "sync", kind = %E::KIND, %id, %operation, "rejected: entity not persisted yet");
            self.emit_failure(id, operation, &reason);
            return Err(reason);
        }
        let exists = self.read_store()?.contains(id);
        if !exists {
            let reason = SyncError::not_found(E::KIND, id.as_str());
            tracing::warn!(target: "sync", kind = %E::KIND, %id, %operation, "rejected: {}", reason);
            self.emit_failure(id, operation, &reason);
            return Err(reason);
        }

        let mut ticket = self.lanes.enqueue(id);
        self.begin_mutation();

        let inner = Arc::clone(self);
        let target = id.clone();
        let join = if ticket.is_clear() {
            let applied = match self.apply(id, &op) {
                Ok(applied) => applied,
                Err(reason) => {
                    self.end_mutation();
                    drop(ticket);
                    self.emit_failure(id, operation, &reason);
                    return Err(reason);
                }
            };
            tokio::spawn(async move { inner.settle(ticket, target, op, applied).await })
        } else {
            tracing::debug!(target: "sync", kind = %E::KIND, %id, %operation, "queued behind pending mutation");
            tokio::spawn(async move {
                let mut ticket = ticket;
                ticket.wait().await;
                match inner.apply(&target, &op) {
                    Ok(applied) => inner.settle(ticket, target, op, applied).await,
                    Err(reason) => {
                        inner.end_mutation();
                        drop(ticket);
                        let outcome = MutationOutcome::RolledBack {
                            entity_id: target,
                            reason,
                        };
                        inner.emit(&outcome, operation);
                        outcome
                    }
                }
            })
        };

        Ok(MutationHandle::new(id.clone(), operation, join))
    }

    /// Snapshot, then mutate. Both under one write lock.
    fn apply(&self, id: &EntityId, op: &PendingOp<E>) -> Result<Applied<E>> {
        let mut store = self.write_store()?;
        let snapshot = store.snapshot();
        let change = match op {
            PendingOp::Update { patch, .. } => {
                store.update(id, patch)?;
                StoreChange::Updated { id: id.clone() }
            }
            PendingOp::Delete => {
                store.remove(id)?;
                StoreChange::Removed { id: id.clone() }
            }
        };
        let revision = store.revision();
        drop(store);

        self.publish(change);
        tracing::debug!(target: "sync", kind = %E::KIND, %id, operation = %op.operation(), "applied optimistically");
        Ok(Applied { snapshot, revision })
    }

    async fn settle(
        &self,
        ticket: Ticket,
        id: EntityId,
        op: PendingOp<E>,
        applied: Applied<E>,
    ) -> MutationOutcome {
        let operation = op.operation();
        let result = match op {
            PendingOp::Update { payload, .. } => {
                match self.transport.update_entity(&id, payload).await {
                    Ok(ack) if ack.success => Ok(()),
                    Ok(_) => Err(SyncError::rejected(Operation::Update, id.as_str())),
                    Err(e) => Err(e),
                }
            }
            PendingOp::Delete => self.transport.delete_entity(&id).await,
        };

        let outcome = match result {
            Ok(()) => MutationOutcome::Confirmed { entity_id: id },
            Err(reason) => {
                self.roll_back(&id, applied, &reason);
                MutationOutcome::RolledBack {
                    entity_id: id,
                    reason,
                }
            }
        };
        self.end_mutation();
        self.emit(&outcome, operation);
        drop(ticket);
        outcome
    }

    /// Restores the whole snapshot when nothing else wrote to the store since
    /// the optimistic apply; otherwise restores only `id`, so that work on
    /// other ids survives.
    fn roll_back(&self, id: &EntityId, applied: Applied<E>, reason: &SyncError) {
        let mut store = match self.write_store() {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(target: "sync", kind = %E::KIND, %id, "rollback impossible: {}", e);
                return;
            }
        };
        let whole = store.revision() == applied.revision;
        if whole {
            store.restore(applied.snapshot);
        } else {
            store.restore_entity(&applied.snapshot, id);
        }
        drop(store);

        self.publish(StoreChange::RolledBack { id: id.clone() });
        tracing::warn!(target: "sync", kind = %E::KIND, %id, whole, "rolled back: {}", reason);
    }

    fn apply_list(&self, epoch: Option<u64>, records: Vec<E::Record>) -> Result<RefreshOutcome> {
        let mut store = self.write_store()?;
        let in_flight = self.in_flight.load(Ordering::SeqCst);
        let raced = epoch.is_some_and(|epoch| epoch != self.epoch.load(Ordering::SeqCst));
        if in_flight > 0 || raced {
            tracing::debug!(target: "refresh", kind = %E::KIND, in_flight, raced, "server list deferred");
            return Ok(RefreshOutcome::Deferred);
        }
        let count = reconcile_list(&mut store, records)?;
        drop(store);

        self.publish(StoreChange::Reloaded { count });
        tracing::debug!(target: "refresh", kind = %E::KIND, count, "store reloaded from server");
        Ok(RefreshOutcome::Applied { count })
    }
}
