//! # Registry of work that is still executing.
//!
//! Updated directly by the work wrapper (`WorkGuard` in `core::supervise`), not
//! through the event bus, so a lagging event listener can never leave entries
//! behind.
//!
//! ```text
//! WorkGuard::start ──► AliveTracker::insert(id, name)
//! WorkGuard::drop  ──► AliveTracker::remove(id)
//!
//! TaskRunner::running / GraceExceeded.stuck ──► AliveTracker::snapshot()
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Thread-safe set of executing work, keyed by submission id.
#[derive(Default)]
pub(crate) struct AliveTracker {
    state: Mutex<BTreeMap<u64, Arc<str>>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Marks submission `id` as executing.
    pub(crate) fn insert(&self, id: u64, name: Arc<str>) {
        self.lock().insert(id, name);
    }

    /// Marks submission `id` as exited.
    pub(crate) fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    /// Returns `name#id` labels ordered by submission id.
    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|(id, name)| format!("{name}#{id}"))
            .collect()
    }

    // Critical sections never call user code, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, Arc<str>>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
