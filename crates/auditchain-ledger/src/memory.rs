use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::entry::Entry;
use crate::error::StoreError;
use crate::traits::EntryStore;

/// In-memory entry store for tests, local demos, and embedding.
///
/// Supports failure injection so callers can exercise the append failure
/// path without a real disk fault.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<Option<Vec<Entry>>>,
    failures_remaining: AtomicU32,
    persist_calls: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `entries`, as if persisted earlier.
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries: RwLock::new(Some(entries)),
            ..Self::default()
        }
    }

    /// Make the next `count` persist calls fail.
    pub fn fail_next(&self, count: u32) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Make every persist call fail until reset with `fail_next(0)`.
    pub fn fail_always(&self) {
        self.fail_next(u32::MAX);
    }

    /// What a reload would observe.
    pub fn snapshot(&self) -> Option<Vec<Entry>> {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of persist attempts, successful or not.
    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

impl EntryStore for InMemoryStore {
    fn load(&self) -> Result<Option<Vec<Entry>>, StoreError> {
        match self.snapshot() {
            Some(entries) if entries.is_empty() => Err(StoreError::Malformed {
                location: self.location(),
                reason: "ledger contains no entries".into(),
            }),
            other => Ok(other),
        }
    }

    fn persist(&self, entries: &[Entry]) -> Result<(), StoreError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(StoreError::Unavailable("injected persist failure".into()));
        }
        let mut stored = self
            .entries
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        *stored = Some(entries.to_vec());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".into()
    }
}
