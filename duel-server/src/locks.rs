use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per store key, created on first use and dropped again
/// once nobody holds or waits on it.
///
/// Callers that need several keys must acquire them in a fixed global order
/// (room, then users sorted, then `public_rooms`, then `room_index`).
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held lock on one key. Releasing it removes the key's entry when idle.
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.forget(&self.key);
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let guard = self.handle(key).lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Lock `keys` in the order given, skipping repeats.
    pub async fn lock_all(&self, keys: &[String]) -> Vec<KeyGuard<'_>> {
        let mut guards = Vec::with_capacity(keys.len());
        let mut seen: Vec<&str> = Vec::with_capacity(keys.len());

        for key in keys {
            if seen.contains(&key.as_str()) {
                continue;
            }
            seen.push(key);
            guards.push(self.lock(key).await);
        }
        guards
    }

    // The map's own reference is the only one left when nobody holds or
    // waits on the mutex. `remove_if` runs under the shard lock, so it
    // cannot interleave with `handle` cloning the entry.
    fn forget(&self, key: &str) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
