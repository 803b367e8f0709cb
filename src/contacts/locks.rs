//! Per-identity-key mutual exclusion
//!
//! Resolutions touching the same email or phone run one at a time;
//! resolutions over disjoint identities never wait on each other. A request
//! takes every key it touches in sorted order, so two requests sharing more
//! than one key cannot deadlock. An entry is removed as soon as the last
//! holder releases it and nobody is queued behind it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily-created async locks keyed by identity key
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Guards held for the duration of one resolution
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire all `keys`. Callers pass keys sorted and deduplicated.
    pub async fn acquire(&self, keys: &[String]) -> KeyGuard<'_> {
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            let lock = self.lock_for(key);
            guards.push(lock.lock_owned().await);
        }
        KeyGuard {
            locks: self,
            keys: keys.to_vec(),
            guards,
        }
    }

    /// Number of keys currently tracked
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }

    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the entry for `key` if nobody holds or waits on it
    fn release(&self, key: &str) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the map holds the only reference to idle entries
        self.guards.clear();
        for key in &self.keys {
            self.locks.release(key);
        }
    }
}
