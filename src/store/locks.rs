//! In-process lock discipline for conflicting mutations
//!
//! One global lock guards the waiting set (join, leave, call and any
//! renumbering), and a keyed lock per participant guards stats
//! read-modify-write. Acquisition order is always queue lock first, then
//! participant locks in ascending id order.

use crate::types::ParticipantId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard, OwnedMutexGuard};

/// Shared lock table used by every engine component
#[derive(Debug, Default)]
pub struct LockTable {
    queue: AsyncMutex<()>,
    participants: Mutex<HashMap<ParticipantId, Arc<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to the waiting set
    pub async fn queue(&self) -> MutexGuard<'_, ()> {
        self.queue.lock().await
    }

    /// Exclusive access to the stats of every listed participant
    pub async fn participants(&self, ids: &[ParticipantId]) -> Vec<OwnedMutexGuard<()>> {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let locks: Vec<Arc<AsyncMutex<()>>> = {
            let mut table = self
                .participants
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let locks = ordered
                .iter()
                .map(|id| table.entry(*id).or_default().clone())
                .collect();
            // Drop entries nobody holds or waits on
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
        };

        let mut guards = Vec::with_capacity(locks.len());
        for lock in locks {
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    /// Number of participant locks currently tracked
    pub fn tracked_participants(&self) -> usize {
        self.participants
            .lock()
            .map(|table| table.len())
            .unwrap_or_default()
    }
}
