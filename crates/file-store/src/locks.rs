//! Per-name mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

/// Map of file name → async lock.
///
/// Entries nobody holds or waits on are pruned on the next acquire, so the
/// map stays proportional to the number of names currently in use.
#[derive(Default)]
pub struct NameLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held while a name is locked; releases on drop.
pub struct NameGuard {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl NameGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `name` is free and locks it.
    pub async fn acquire(&self, name: &str) -> NameGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(map.entry(name.to_string()).or_default())
        };

        NameGuard {
            name: name.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Locks two names in a fixed order so concurrent callers cannot
    /// deadlock. A single guard is returned when both names are equal.
    pub async fn acquire_pair(&self, a: &str, b: &str) -> (NameGuard, Option<NameGuard>) {
        if a == b {
            return (self.acquire(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let g1 = self.acquire(first).await;
        let g2 = self.acquire(second).await;
        (g1, Some(g2))
    }

    /// Number of names currently tracked.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
