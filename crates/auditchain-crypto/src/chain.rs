use serde_json::Value;

use crate::hasher::EntryHasher;

/// `previous_hash` carried by the genesis link.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Trait for records that participate in a hash chain.
pub trait ChainLink {
    /// 1-based position recorded in the link itself.
    fn position(&self) -> u64;
    /// The link's own stored hash.
    fn link_hash(&self) -> &str;
    /// The stored hash of the preceding link (`"0"` for genesis).
    fn previous_link_hash(&self) -> &str;
    /// Every field except the link's own hash, as digest input.
    fn digest_input(&self) -> Value;
}

/// Hash chain integrity verifier.
///
/// Verifies that a sequence of links forms a valid hash chain:
/// positions count up from 1, each link's previous hash matches the stored
/// hash of the link before it, and each link's hash is correctly computed
/// from its own content.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain, stopping at the first failure.
    pub fn verify_chain<L: ChainLink>(links: &[L], hasher: &EntryHasher) -> Result<(), ChainError> {
        match Self::scan(links, hasher).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Check every link and collect all failures in chain order.
    ///
    /// Checks per link:
    /// 1. Recorded position equals its offset + 1
    /// 2. Genesis carries the `"0"` sentinel; later links reference their
    ///    predecessor's stored hash
    /// 3. Stored hash equals the recomputed digest
    pub fn scan<L: ChainLink>(links: &[L], hasher: &EntryHasher) -> Vec<ChainError> {
        let mut errors = Vec::new();

        for (offset, link) in links.iter().enumerate() {
            let expected = offset as u64 + 1;
            if link.position() != expected {
                errors.push(ChainError::IndexGap {
                    expected,
                    found: link.position(),
                });
            }

            if offset == 0 {
                if link.previous_link_hash() != GENESIS_PREVIOUS_HASH {
                    errors.push(ChainError::GenesisPrevHash {
                        found: link.previous_link_hash().to_string(),
                    });
                }
            } else if link.previous_link_hash() != links[offset - 1].link_hash() {
                errors.push(ChainError::BrokenLink { index: expected });
            }

            match hasher.hash_value(&link.digest_input()) {
                Ok(computed) if computed == link.link_hash() => {}
                Ok(_) => errors.push(ChainError::HashMismatch { index: expected }),
                Err(e) => errors.push(ChainError::Digest {
                    index: expected,
                    reason: e.to_string(),
                }),
            }
        }

        errors
    }

    /// Compute the expected hash for a link's digest input.
    pub fn compute_hash<L: ChainLink>(link: &L, hasher: &EntryHasher) -> Result<String, ChainError> {
        hasher
            .hash_value(&link.digest_input())
            .map_err(|e| ChainError::Digest {
                index: link.position(),
                reason: e.to_string(),
            })
    }
}

/// Errors from chain verification. `index` is the 1-based chain position.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("genesis previous hash is {found:?}, expected \"0\"")]
    GenesisPrevHash { found: String },

    #[error("index gap: expected {expected}, found {found}")]
    IndexGap { expected: u64, found: u64 },

    #[error("broken link at index {index}: previous_hash does not match")]
    BrokenLink { index: u64 },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: u64 },

    #[error("cannot digest entry at index {index}: {reason}")]
    Digest { index: u64, reason: String },
}

impl ChainError {
    /// Chain position the failure was detected at.
    pub fn index(&self) -> u64 {
        match self {
            Self::GenesisPrevHash { .. } => 1,
            Self::IndexGap { expected, .. } => *expected,
            Self::BrokenLink { index }
            | Self::HashMismatch { index }
            | Self::Digest { index, .. } => *index,
        }
    }
}
