//! Hashing primitives for the audit chain.
//!
//! Provides the canonical JSON encoding that entry digests are computed over,
//! SHA-256 and domain-separated BLAKE3 entry hashers, and hash chain
//! verification over any sequence of linked records.
//!
//! Digests come from the `sha2` and `blake3` crates; nothing here is custom
//! cryptography.

pub mod canonical;
pub mod chain;
pub mod hasher;

pub use canonical::{to_canonical_string, to_canonical_vec};
pub use chain::{ChainError, ChainLink, HashChainVerifier, GENESIS_PREVIOUS_HASH};
pub use hasher::{DigestAlgorithm, EntryHasher, HasherError};
