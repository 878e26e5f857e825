use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::canonical::to_canonical_vec;

/// Domain tag prepended to BLAKE3 entry digests.
const BLAKE3_ENTRY_DOMAIN: &str = "auditchain-entry-v1";

/// Hash function used to compute entry digests.
///
/// Both produce 256-bit digests rendered as 64 lowercase hex characters. The
/// algorithm is a property of the ledger file: a chain written with one
/// algorithm only verifies with the same one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Plain SHA-256 over the canonical bytes. Compatible with ledger files
    /// written by the storefront before this crate existed.
    #[default]
    Sha256,
    /// Domain-separated BLAKE3 over the canonical bytes.
    Blake3,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(HasherError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Entry digest calculator.
///
/// Couples a [`DigestAlgorithm`] with the canonical JSON encoding so that
/// semantically identical content always hashes to the same hex string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EntryHasher {
    algorithm: DigestAlgorithm,
}

impl EntryHasher {
    /// SHA-256 hasher.
    pub const SHA256: Self = Self {
        algorithm: DigestAlgorithm::Sha256,
    };
    /// Domain-separated BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        algorithm: DigestAlgorithm::Blake3,
    };

    pub const fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest raw bytes, lowercase hex.
    pub fn digest(&self, data: &[u8]) -> String {
        match self.algorithm {
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            DigestAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(BLAKE3_ENTRY_DOMAIN.as_bytes());
                hasher.update(b":");
                hasher.update(data);
                hex::encode(hasher.finalize().as_bytes())
            }
        }
    }

    /// Digest the canonical encoding of a JSON value.
    pub fn hash_value(&self, value: &Value) -> Result<String, HasherError> {
        let encoded =
            to_canonical_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.digest(&encoded))
    }

    /// Digest any serializable value through its JSON form.
    pub fn hash_json<T: Serialize>(&self, value: &T) -> Result<String, HasherError> {
        let value =
            serde_json::to_value(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        self.hash_value(&value)
    }

    /// Check that `value` hashes to `expected`.
    pub fn verify(&self, value: &Value, expected: &str) -> bool {
        self.hash_value(value)
            .map(|computed| computed == expected)
            .unwrap_or(false)
    }

    /// Returns `true` if `s` has the shape of a digest this crate produces.
    pub fn is_digest(s: &str) -> bool {
        s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
}
