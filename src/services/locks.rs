use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{Mutex as AsyncMutex, OwnedMutexGuard},
    time::Instant,
};
use tracing::debug;

use crate::error::{Error, Result};

// Entries exist only while a seat is held or awaited.
type Slots = Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>;

#[derive(Clone, Default)]
pub struct SeatLocks {
    slots: Slots,
}

impl SeatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every seat in `seat_ids`, smallest id first. Fails with
    /// [`Error::LockTimeout`] once `timeout` has elapsed; seats locked so far
    /// are released before returning.
    pub async fn acquire(
        &self,
        seat_ids: impl IntoIterator<Item = i64>,
        timeout: Duration,
    ) -> Result<SeatLockGuard> {
        let ordered: BTreeSet<i64> = seat_ids.into_iter().collect();
        let deadline = Instant::now() + timeout;
        let mut guard = SeatLockGuard {
            slots: self.slots.clone(),
            held: Vec::with_capacity(ordered.len()),
        };

        for seat_id in ordered {
            let slot = self.slot(seat_id);
            match tokio::time::timeout_at(deadline, slot.lock_owned()).await {
                Ok(lock) => guard.held.push((seat_id, lock)),
                Err(_) => {
                    debug!(seat_id, held = guard.held.len(), "seat lock wait timed out");
                    release_idle(&self.slots, [seat_id]);
                    return Err(Error::LockTimeout);
                }
            }
        }
        Ok(guard)
    }

    /// Number of seats with a live lock entry.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, seat_id: i64) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(seat_id).or_default().clone()
    }
}

fn release_idle(slots: &Slots, seat_ids: impl IntoIterator<Item = i64>) {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    for id in seat_ids {
        // Only the map itself references an idle slot.
        if slots.get(&id).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(&id);
        }
    }
}

/// Holds a set of seat locks; releases them on drop.
#[derive(Debug)]
pub struct SeatLockGuard {
    slots: Slots,
    held: Vec<(i64, OwnedMutexGuard<()>)>,
}

impl SeatLockGuard {
    pub fn seat_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.held.iter().map(|(id, _)| *id)
    }
}

impl Drop for SeatLockGuard {
    fn drop(&mut self) {
        let held = std::mem::take(&mut self.held);
        let ids: Vec<i64> = held.iter().map(|(id, _)| *id).collect();
        drop(held);
        release_idle(&self.slots, ids);
    }
}
