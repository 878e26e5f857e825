use std::io;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Persisted entries could not be read at startup. Recovered locally by
    /// starting from a fresh genesis entry; only ever logged.
    #[error("failed to load ledger from {location}: {source}")]
    LoadFailed {
        location: String,
        #[source]
        source: StoreError,
    },

    /// An append could not be completed. The in-memory sequence was rolled
    /// back to the last durable state.
    #[error("failed to append entry {index}: {source}")]
    AppendFailed {
        index: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("integrity violation at index {index}: {reason}")]
    IntegrityViolation { index: u64, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Errors produced by entry stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored data exists but is not a non-empty sequence of entries.
    #[error("malformed ledger at {location}: {reason}")]
    Malformed { location: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
