//! Per-path advisory locks for mutating storage operations.
//!
//! The filesystem tree is shared mutable state; OS rename atomicity alone
//! leaves delete-then-recreate races observable. Mutating operations take the
//! lock for their resolved path so overlapping mutations of the same entry
//! serialise inside the process. The per-path mutex is a tokio mutex: the
//! upload handler holds it across awaited writes, while the blocking storage
//! methods take it with `blocking_lock`. Locks are created on demand and
//! pruned once uncontended.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Mutex as PathMutex;

/// Process-wide map of resolved path to advisory mutex.
#[derive(Debug, Default)]
pub struct PathLockMap {
    inner: Mutex<HashMap<PathBuf, Arc<PathMutex<()>>>>,
}

impl PathLockMap {
    /// Create an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (creating on demand) the lock for `path`.
    ///
    /// Callers hold the returned handle and lock it for the duration of the
    /// mutation. Stale entries whose only holder is the map itself are pruned
    /// on every acquisition, so the map stays proportional to in-flight work.
    #[must_use]
    pub fn handle(&self, path: &Path) -> Arc<PathMutex<()>> {
        let mut map = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        Arc::clone(map.entry(path.to_path_buf()).or_default())
    }

    /// Fetch lock handles for a pair of paths, sorted into locking order.
    ///
    /// Callers lock the first handle before the second. Sorting by path
    /// prevents lock-order inversion between two concurrent moves with
    /// swapped endpoints. The caller must not pass equal paths.
    #[must_use]
    pub fn handle_pair(&self, a: &Path, b: &Path) -> (Arc<PathMutex<()>>, Arc<PathMutex<()>>) {
        debug_assert_ne!(a, b, "equal paths must take a single lock");
        if a <= b {
            (self.handle(a), self.handle(b))
        } else {
            (self.handle(b), self.handle(a))
        }
    }
}
