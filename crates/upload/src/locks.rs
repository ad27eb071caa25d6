//! Keyed locks serializing check-then-act steps inside one process.
//!
//! Find-or-create of a folder and the free-name check before a file upload
//! both look at the remote, then write to it. Two flows doing that for the
//! same `(parent, name)` at once would both miss and both write; holding the
//! key's lock from the lookup until the entry exists prevents that here.
//! Other processes can still race.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (String, String);

/// Set of async locks keyed by `(parent_id, name)`.
///
/// Entries exist only while some flow holds or waits for them.
#[derive(Default)]
pub struct ResolveLocks {
    slots: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl ResolveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<LockKey, Arc<AsyncMutex<()>>>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Waits for exclusive access to `segment` under `parent_id`.
    pub async fn acquire(&self, parent_id: &str, segment: &str) -> ResolveGuard<'_> {
        let key = (parent_id.to_string(), segment.to_string());
        let slot = Arc::clone(self.slots().entry(key.clone()).or_default());
        let guard = slot.lock_owned().await;
        ResolveGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.slots().len()
    }
}

/// Holds one key of a [`ResolveLocks`]; releases it on drop.
pub struct ResolveGuard<'a> {
    locks: &'a ResolveLocks,
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ResolveGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.locks.slots();
        // Only the map's own reference left: nobody holds or waits.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
