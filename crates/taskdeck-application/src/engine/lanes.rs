//! Per-id mutation lanes.
//!
//! Each id has at most one mutation between optimistic apply and settlement.
//! A later mutation on the same id takes a ticket chained to the previous
//! one and waits for it before touching the store, so mutations on one id
//! resolve in issue order. Ids without a lane are idle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use taskdeck_core::EntityId;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

struct Lane {
    seq: u64,
    /// Closes when the newest ticket on this lane is dropped.
    done: oneshot::Receiver<()>,
}

type Lanes = Arc<Mutex<HashMap<EntityId, Lane>>>;

fn lock(lanes: &Lanes) -> MutexGuard<'_, HashMap<EntityId, Lane>> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub(super) struct LaneTable {
    lanes: Lanes,
    next_seq: AtomicU64,
}

impl LaneTable {
    /// Takes a place at the back of `id`'s lane. Issue order is fixed here,
    /// synchronously, not when the ticket is first awaited.
    pub(super) fn enqueue(&self, id: &EntityId) -> Ticket {
        let (release, done) = oneshot::channel();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let previous = lock(&self.lanes).insert(id.clone(), Lane { seq, done });
        Ticket {
            id: id.clone(),
            seq,
            previous: previous.map(|lane| lane.done),
            _release: release,
            lanes: Arc::clone(&self.lanes),
        }
    }

    pub(super) fn contains(&self, id: &EntityId) -> bool {
        lock(&self.lanes).contains_key(id)
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        lock(&self.lanes).len()
    }
}

/// A place in an id's lane. Dropping it lets the next ticket proceed.
pub(super) struct Ticket {
    id: EntityId,
    seq: u64,
    previous: Option<oneshot::Receiver<()>>,
    _release: oneshot::Sender<()>,
    lanes: Lanes,
}

impl Ticket {
    /// True when no earlier mutation on this id is still running.
    pub(super) fn is_clear(&mut self) -> bool {
        let Some(previous) = self.previous.as_mut() else {
            return true;
        };
        match previous.try_recv() {
            Err(TryRecvError::Empty) => false,
            _ => {
                self.previous = None;
                true
            }
        }
    }

    /// Waits until the earlier mutation on this id has settled.
    pub(super) async fn wait(&mut self) {
        if let Some(previous) = self.previous.take() {
            // Err means the sender was dropped, which is the release signal.
            let _ = previous.await;
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut lanes = lock(&self.lanes);
        if lanes.get(&self.id).is_some_and(|lane| lane.seq == self.seq) {
            lanes.remove(&self.id);
        }
    }
}
