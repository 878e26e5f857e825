use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use auditchain_crypto::{EntryHasher, GENESIS_PREVIOUS_HASH};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::entry::Entry;
use crate::error::{LedgerError, StoreError};
use crate::file::JsonFileStore;
use crate::projection::AuditIndex;
use crate::traits::EntryStore;
use crate::validation::{verify_entries, VerificationReport};

/// Append-only, hash-chained audit ledger.
///
/// One instance per process, shared by reference (typically `Arc<Ledger>`).
/// Appends hold the write lock across "read last hash, build entry, push,
/// persist", so concurrent producers are serialized and readers never see a
/// sequence that is ahead of disk.
pub struct Ledger {
    store: Box<dyn EntryStore>,
    hasher: EntryHasher,
    clock: Box<dyn Clock>,
    persist_retries: u32,
    /// Unreadable data still sits at the store location and must be moved
    /// aside before anything is written over it.
    unpreserved: AtomicBool,
    entries: RwLock<Vec<Entry>>,
}

/// Builder for [`Ledger`] over an arbitrary store.
pub struct LedgerBuilder {
    store: Box<dyn EntryStore>,
    hasher: EntryHasher,
    clock: Box<dyn Clock>,
    persist_retries: u32,
    preserve_invalid: bool,
    verify_on_load: bool,
}

impl LedgerBuilder {
    pub fn new(store: impl EntryStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            hasher: EntryHasher::default(),
            clock: Box::new(SystemClock),
            persist_retries: 0,
            preserve_invalid: true,
            verify_on_load: true,
        }
    }

    /// Apply every non-storage setting from `config`.
    pub fn config(mut self, config: &LedgerConfig) -> Self {
        self.hasher = EntryHasher::new(config.digest);
        self.persist_retries = config.persist_retries;
        self.preserve_invalid = config.preserve_invalid;
        self.verify_on_load = config.verify_on_load;
        self
    }

    pub fn hasher(mut self, hasher: EntryHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn persist_retries(mut self, retries: u32) -> Self {
        self.persist_retries = retries;
        self
    }

    pub fn preserve_invalid(mut self, preserve: bool) -> Self {
        self.preserve_invalid = preserve;
        self
    }

    pub fn verify_on_load(mut self, verify: bool) -> Self {
        self.verify_on_load = verify;
        self
    }

    /// Load the persisted chain, or start a fresh one from genesis.
    ///
    /// Never fails: unreadable or malformed storage is logged and replaced by
    /// a new genesis entry, and a genesis entry that cannot be persisted is
    /// kept in memory until the next successful append writes it out. With
    /// `preserve_invalid`, stored data that could not be loaded is moved
    /// aside first; while that move keeps failing, nothing is written.
    pub fn open(self) -> Ledger {
        let ledger = Ledger {
            store: self.store,
            hasher: self.hasher,
            clock: self.clock,
            persist_retries: self.persist_retries,
            unpreserved: AtomicBool::new(false),
            entries: RwLock::new(Vec::new()),
        };

        let loaded = ledger.load(self.preserve_invalid);
        let entries = match loaded {
            Some(entries) => {
                info!(
                    location = %ledger.store.location(),
                    entries = entries.len(),
                    "ledger loaded"
                );
                if self.verify_on_load {
                    log_violations(&verify_entries(&entries, &ledger.hasher));
                }
                entries
            }
            None => ledger.start_genesis(),
        };

        *ledger.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
        ledger
    }
}

impl Ledger {
    /// Open the JSON-file ledger described by `config`.
    pub fn open(config: &LedgerConfig) -> Self {
        LedgerBuilder::new(JsonFileStore::from_config(config))
            .config(config)
            .open()
    }

    pub fn builder(store: impl EntryStore + 'static) -> LedgerBuilder {
        LedgerBuilder::new(store)
    }

    fn load(&self, preserve_invalid: bool) -> Option<Vec<Entry>> {
        match self.store.load() {
            Ok(found) => found,
            Err(source) => {
                let err = LedgerError::LoadFailed {
                    location: self.store.location(),
                    source,
                };
                warn!(error = %err, "starting a fresh ledger from genesis");
                if preserve_invalid {
                    if let Err(e) = self.store.quarantine() {
                        warn!(error = %e, "could not move unreadable ledger aside; writes held until it is");
                        self.unpreserved.store(true, Ordering::SeqCst);
                    }
                }
                None
            }
        }
    }

    fn start_genesis(&self) -> Vec<Entry> {
        let genesis = match Entry::genesis(self.clock.timestamp(), &self.hasher) {
            Ok(entry) => entry,
            Err(e) => {
                // The genesis digest input is fixed-shape; this cannot fail
                // for any timestamp the clock produces.
                error!(error = %e, "cannot hash genesis entry");
                return Vec::new();
            }
        };
        let entries = vec![genesis];
        if self.unpreserved.load(Ordering::SeqCst) {
            return entries;
        }
        match self.persist(&entries) {
            Ok(()) => info!(location = %self.store.location(), "created genesis entry"),
            Err(e) => error!(
                location = %self.store.location(),
                error = %e,
                "genesis entry not persisted; it will be written with the next append"
            ),
        }
        entries
    }

    /// Append `payload` as a new entry and persist the whole chain.
    ///
    /// The payload is stored verbatim and never interpreted. If the entry
    /// cannot be persisted, the in-memory chain is rolled back so that it
    /// always equals what a reload would see, and `AppendFailed` is
    /// returned.
    pub fn append(&self, payload: impl Into<Value>) -> Result<Entry, LedgerError> {
        let payload = payload.into();
        let mut entries = self.entries.write().map_err(|_| LedgerError::LockPoisoned)?;
        let index = entries.len() as u64 + 1;

        let previous_hash = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string());

        let entry = Entry::seal(index, self.clock.timestamp(), payload, previous_hash, &self.hasher)
            .map_err(|e| {
                error!(index, error = %e, "cannot hash entry");
                LedgerError::AppendFailed {
                    index,
                    source: Box::new(e),
                }
            })?;

        if self.unpreserved.load(Ordering::SeqCst) {
            if let Err(e) = self.store.quarantine() {
                error!(index, location = %self.store.location(), error = %e, "append refused; unreadable ledger still in place");
                return Err(LedgerError::AppendFailed {
                    index,
                    source: Box::new(e),
                });
            }
            self.unpreserved.store(false, Ordering::SeqCst);
        }

        let pending = PendingAppend::push(&mut entries, entry.clone());
        if let Err(e) = self.persist(&pending.entries[..]) {
            drop(pending);
            error!(index, location = %self.store.location(), error = %e, "append failed; entry rolled back");
            return Err(LedgerError::AppendFailed {
                index,
                source: Box::new(e),
            });
        }
        pending.commit();

        debug!(index, hash = %entry.hash, "entry appended");
        Ok(entry)
    }

    /// Append any serializable value through its JSON form.
    pub fn append_json<T: Serialize>(&self, payload: &T) -> Result<Entry, LedgerError> {
        let value = serde_json::to_value(payload).map_err(|e| LedgerError::AppendFailed {
            index: self.len() as u64 + 1,
            source: Box::new(e),
        })?;
        self.append(value)
    }

    /// Best-effort append for producers that must not be blocked by audit
    /// failures. The failure is logged and `None` returned.
    pub fn record(&self, payload: impl Into<Value>) -> Option<Entry> {
        match self.append(payload) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "audit event not recorded");
                None
            }
        }
    }

    fn persist(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let mut attempt = 0;
        loop {
            match self.store.persist(entries) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.persist_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "persist failed; retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Entry>> {
        // A pending append pops its entry even when persisting panics, so a
        // poisoned guard still holds the durable sequence.
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_last_entry(&self) -> Option<Entry> {
        self.read().last().cloned()
    }

    /// The full chain, oldest first.
    pub fn get_all_entries(&self) -> Vec<Entry> {
        self.read().clone()
    }

    /// Entry at a 1-based index.
    pub fn get_entry(&self, index: u64) -> Option<Entry> {
        let position = usize::try_from(index.checked_sub(1)?).ok()?;
        self.read().get(position).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns `true` if every chain invariant holds.
    pub fn verify_chain(&self) -> bool {
        self.verify().is_valid()
    }

    /// Full verification report for the current chain.
    pub fn verify(&self) -> VerificationReport {
        verify_entries(&self.read(), &self.hasher)
    }

    /// Operator-facing summary of the recorded actions.
    pub fn audit_index(&self) -> AuditIndex {
        AuditIndex::build(&self.read())
    }

    pub fn hasher(&self) -> &EntryHasher {
        &self.hasher
    }

    pub fn location(&self) -> String {
        self.store.location()
    }
}

/// Entry pushed ahead of persistence. Popped on drop unless committed.
struct PendingAppend<'a> {
    entries: &'a mut Vec<Entry>,
    committed: bool,
}

impl<'a> PendingAppend<'a> {
    fn push(entries: &'a mut Vec<Entry>, entry: Entry) -> Self {
        entries.push(entry);
        Self {
            entries,
            committed: false,
        }
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for PendingAppend<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.entries.pop();
        }
    }
}

fn log_violations(report: &VerificationReport) {
    for violation in &report.violations {
        warn!(
            index = violation.index,
            kind = ?violation.kind,
            "{}",
            violation.description
        );
    }
}
