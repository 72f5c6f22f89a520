//! Per-tournament mutation locks.
//!
//! Every read-then-write sequence against one tournament (registration,
//! rebuys, eliminations, settlement, deletion) runs while holding that
//! tournament's lock, so head-counts taken during an elimination cannot go
//! stale underneath a concurrent request.

use super::models::TournamentId;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Registry of async mutexes keyed by tournament id
#[derive(Clone, Default)]
pub struct TournamentLocks {
    locks: Arc<RwLock<HashMap<TournamentId, Arc<Mutex<()>>>>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a tournament
    ///
    /// The returned guard releases the lock when dropped.
    pub async fn acquire(&self, tournament_id: TournamentId) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().await.get(&tournament_id).cloned();

        let lock = match existing {
            Some(lock) => lock,
            None => self
                .locks
                .write()
                .await
                .entry(tournament_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone(),
        };

        lock.lock_owned().await
    }

    /// Drop the lock entry of a deleted tournament
    pub async fn forget(&self, tournament_id: TournamentId) {
        self.locks.write().await.remove(&tournament_id);
    }

    /// Number of tournaments with a lock entry
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
