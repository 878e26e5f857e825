use crate::entry::Entry;
use crate::error::StoreError;

/// Durable storage boundary for the ledger.
///
/// A store holds one ordered sequence of entries and always rewrites it as a
/// whole. The ledger serializes every call, so implementations need no
/// locking of their own beyond what `Sync` demands.
pub trait EntryStore: Send + Sync {
    /// Read the persisted sequence.
    ///
    /// `Ok(None)` means nothing has been stored yet. Data that exists but is
    /// not a non-empty sequence of entries is `StoreError::Malformed`.
    fn load(&self) -> Result<Option<Vec<Entry>>, StoreError>;

    /// Replace the persisted sequence with `entries`.
    fn persist(&self, entries: &[Entry]) -> Result<(), StoreError>;

    /// Move unreadable stored data aside so that re-initialization does not
    /// overwrite it. Returns the new location, if anything was moved.
    fn quarantine(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    /// Human-readable location, for logs.
    fn location(&self) -> String;
}
