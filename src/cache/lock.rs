use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                hint = "state may be stale after panic in another thread",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                hint = "state may be stale after panic in another thread",
                "Recovered from poisoned cache lock"
            );
            poisoned.into_inner()
        }
    }
}

/// Per-key async mutexes.
///
/// Entries exist only while some task holds or waits for the key. Waiters
/// register before they start waiting, so a cancelled wait still releases
/// its share of the entry.
#[derive(Default)]
pub(crate) struct KeyLocks {
    slots: DashMap<String, KeySlot>,
}

#[derive(Default)]
struct KeySlot {
    mutex: Arc<Mutex<()>>,
    users: usize,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn acquire(&self, key: &str) -> KeyGuard<'_> {
        let (registration, mutex) = self.register(key);
        let guard = mutex.lock_owned().await;
        KeyGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    fn register(&self, key: &str) -> (Registration<'_>, Arc<Mutex<()>>) {
        let mut slot = self.slots.entry(key.to_string()).or_default();
        slot.users += 1;
        let mutex = Arc::clone(&slot.mutex);
        drop(slot);
        (
            Registration {
                locks: self,
                key: key.to_string(),
            },
            mutex,
        )
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.len()
    }
}

struct Registration<'a> {
    locks: &'a KeyLocks,
    key: String,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.locks.slots.remove_if_mut(&self.key, |_, slot| {
            slot.users -= 1;
            slot.users == 0
        });
    }
}

/// Held for the duration of a keyed critical section.
pub(crate) struct KeyGuard<'a> {
    // Fields drop in order: the mutex is released before the slot is given up.
    _guard: OwnedMutexGuard<()>,
    _registration: Registration<'a>,
}
