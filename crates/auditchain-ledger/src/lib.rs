//! Append-only, hash-chained audit ledger.
//!
//! This crate records security-relevant events (sign-ups, logins, order
//! workflow transitions) as an ordered chain of entries in which every entry
//! commits to its predecessor's hash. It provides:
//! - The `Entry` record and its genesis rules
//! - `Ledger`, a thread-safe store with append, read, and verify operations
//! - `EntryStore` storage boundary with JSON-file and in-memory backends
//! - Chain verification reports and an audit index projection
//! - Typed storefront events that serialize to ledger payloads

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod projection;
pub mod traits;
pub mod validation;

pub use clock::{Clock, FixedClock, SystemClock, TIMESTAMP_FORMAT};
pub use config::{LedgerConfig, SyncMode, DEFAULT_LEDGER_FILE};
pub use entry::{Entry, GENESIS_DATA};
pub use error::{LedgerError, StoreError};
pub use events::{
    browser_name, AuditEvent, ClientInfo, OrderItem, OrderPlaced, OrderStatus, ShippingAddress,
};
pub use file::JsonFileStore;
pub use ledger::{Ledger, LedgerBuilder};
pub use memory::InMemoryStore;
pub use projection::{AuditIndex, AuditIndexEntry};
pub use traits::EntryStore;
pub use validation::{verify_entries, VerificationReport, Violation, ViolationKind};

pub use auditchain_crypto::{DigestAlgorithm, EntryHasher};
