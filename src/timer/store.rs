//! Timer store
//!
//! Thread-safe mapping from a (user, device) key to at most one active timer,
//! shared by request handlers, the event bridge, and the expiry sweeper.
//!
//! The store also owns the per-key lock arena used to serialize episode
//! increments for the same key. Locks are created lazily and disposed when the
//! key's timer is removed, so unrelated users never contend on one lock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::types::{SleepTimer, TimerKey};

/// Concurrency-safe CRUD over the TimerKey -> SleepTimer mapping.
///
/// Holds no references to collaborators and never sends playback commands;
/// its only side effects are on the mapping itself.
pub struct TimerStore {
    timers: RwLock<HashMap<TimerKey, SleepTimer>>,
    key_locks: Mutex<HashMap<TimerKey, Arc<Mutex<()>>>>,
}

impl TimerStore {
    pub fn new() -> Self {
        Self {
            timers: RwLock::new(HashMap::new()),
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Insert or replace the timer for its key. Returns the previous timer,
    /// if any, so callers can tell whether an earlier timer was displaced.
    pub async fn put(&self, timer: SleepTimer) -> Option<SleepTimer> {
        self.timers.write().await.insert(timer.key.clone(), timer)
    }

    pub async fn get(&self, key: &TimerKey) -> Option<SleepTimer> {
        self.timers.read().await.get(key).cloned()
    }

    /// Remove the timer for `key`, disposing its arena lock. Idempotent:
    /// removing an absent key is a no-op returning `None`.
    pub async fn remove(&self, key: &TimerKey) -> Option<SleepTimer> {
        let removed = self.timers.write().await.remove(key);
        if removed.is_some() {
            self.key_locks.lock().await.remove(key);
        }
        removed
    }

    /// Remove the timer for `key` only if it is still the timer with `id`.
    ///
    /// Used by the sweeper (and completion trigger) so that a timer started
    /// after the decision snapshot is never swept by mistake.
    pub async fn remove_if_id(&self, key: &TimerKey, id: Uuid) -> Option<SleepTimer> {
        let removed = {
            let mut timers = self.timers.write().await;
            if timers.get(key).is_some_and(|timer| timer.id == id) {
                timers.remove(key)
            } else {
                None
            }
        };
        if removed.is_some() {
            self.key_locks.lock().await.remove(key);
        }
        removed
    }

    /// Mutate the timer for `key` in place under the write lock, returning the
    /// closure's result, or `None` when no timer exists. The only mutation
    /// path into a stored timer.
    pub async fn modify<R>(
        &self,
        key: &TimerKey,
        f: impl FnOnce(&mut SleepTimer) -> R,
    ) -> Option<R> {
        self.timers.write().await.get_mut(key).map(f)
    }

    /// Stable copy of every active timer, for the sweeper and cross-user
    /// lookups.
    pub async fn snapshot(&self) -> Vec<SleepTimer> {
        self.timers.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.timers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.timers.read().await.is_empty()
    }

    /// The per-key mutex for `key`, created on first use.
    ///
    /// Holders serialize same-key episode increments; the arena entry is
    /// dropped together with the timer, and a stale Arc held across that
    /// removal is harmless.
    pub async fn key_lock(&self, key: &TimerKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    pub(crate) async fn lock_arena_len(&self) -> usize {
        self.key_locks.lock().await.len()
    }
}

impl Default for TimerStore {
    fn default() -> Self {
        Self::new()
    }
}
