use auditchain_crypto::{ChainLink, EntryHasher, HasherError, GENESIS_PREVIOUS_HASH};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Payload carried by the genesis entry.
pub const GENESIS_DATA: &str = "Genesis Block";

/// One ledger record, chained to its predecessor by hash.
///
/// Field order matches the persisted layout: `index`, `timestamp`, `data`,
/// `previous_hash`, `hash`. The ledger only ever hands out clones, so the
/// stored sequence cannot be edited through these public fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// 1-based position in the chain.
    pub index: u64,
    /// Wall-clock creation time. Advisory only.
    pub timestamp: String,
    /// Caller-supplied payload, stored verbatim.
    pub data: Value,
    /// Hash of the preceding entry, or `"0"` for genesis.
    pub previous_hash: String,
    /// Digest of every other field.
    pub hash: String,
}

impl Entry {
    /// Build an entry and compute its hash.
    pub fn seal(
        index: u64,
        timestamp: impl Into<String>,
        data: Value,
        previous_hash: impl Into<String>,
        hasher: &EntryHasher,
    ) -> Result<Self, HasherError> {
        let mut entry = Self {
            index,
            timestamp: timestamp.into(),
            data,
            previous_hash: previous_hash.into(),
            hash: String::new(),
        };
        entry.hash = hasher.hash_value(&entry.digest_input())?;
        Ok(entry)
    }

    /// Build the genesis entry.
    pub fn genesis(timestamp: impl Into<String>, hasher: &EntryHasher) -> Result<Self, HasherError> {
        Self::seal(
            1,
            timestamp,
            Value::String(GENESIS_DATA.into()),
            GENESIS_PREVIOUS_HASH,
            hasher,
        )
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// The reduced record the hash is computed over: every field but `hash`.
    pub fn digest_input(&self) -> Value {
        json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "data": self.data,
            "previous_hash": self.previous_hash,
        })
    }

    /// Recompute the hash from the entry's current content.
    pub fn recompute_hash(&self, hasher: &EntryHasher) -> Result<String, HasherError> {
        hasher.hash_value(&self.digest_input())
    }

    /// Returns `true` if the stored hash matches the content.
    pub fn verify_hash(&self, hasher: &EntryHasher) -> bool {
        hasher.verify(&self.digest_input(), &self.hash)
    }

    /// First 12 hex characters of the hash, for display.
    pub fn short_hash(&self) -> &str {
        let end = self.hash.len().min(12);
        &self.hash[..end]
    }
}

impl ChainLink for Entry {
    fn position(&self) -> u64 {
        self.index
    }

    fn link_hash(&self) -> &str {
        &self.hash
    }

    fn previous_link_hash(&self) -> &str {
        &self.previous_hash
    }

    fn digest_input(&self) -> Value {
        Entry::digest_input(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2024-05-01 10:15:30.123456";

    #[test]
    fn genesis_shape() {
        let genesis = Entry::genesis(TS, &EntryHasher::SHA256).unwrap();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.data, json!("Genesis Block"));
        assert!(genesis.is_genesis());
        assert!(genesis.verify_hash(&EntryHasher::SHA256));
    }

    #[test]
    fn hash_covers_canonical_reduced_record() {
        let entry = Entry::seal(2, TS, json!({"user": "alice", "action": "login"}), "ab", &EntryHasher::SHA256)
            .unwrap();
        let canonical = format!(
            r#"{{"data": {{"action": "login", "user": "alice"}}, "index": 2, "previous_hash": "ab", "timestamp": "{TS}"}}"#
        );
        assert_eq!(entry.hash, EntryHasher::SHA256.digest(canonical.as_bytes()));
    }

    #[test]
    fn identical_fields_give_identical_hashes() {
        let a = Entry::seal(3, TS, json!({"k": 1}), "p", &EntryHasher::SHA256).unwrap();
        let b = Entry::seal(3, TS, json!({"k": 1}), "p", &EntryHasher::SHA256).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.recompute_hash(&EntryHasher::SHA256).unwrap(), a.hash);
    }

    #[test]
    fn every_field_affects_hash() {
        let base = Entry::seal(3, TS, json!({"k": 1}), "p", &EntryHasher::SHA256).unwrap();
        let variants = [
            Entry::seal(4, TS, json!({"k": 1}), "p", &EntryHasher::SHA256).unwrap(),
            Entry::seal(3, "other", json!({"k": 1}), "p", &EntryHasher::SHA256).unwrap(),
            Entry::seal(3, TS, json!({"k": 2}), "p", &EntryHasher::SHA256).unwrap(),
            Entry::seal(3, TS, json!({"k": 1}), "q", &EntryHasher::SHA256).unwrap(),
        ];
        for variant in variants {
            assert_ne!(variant.hash, base.hash);
        }
    }

    #[test]
    fn edited_entry_fails_self_check() {
        let mut entry = Entry::seal(2, TS, json!({"total": "10.00"}), "p", &EntryHasher::SHA256).unwrap();
        entry.data = json!({"total": "0.00"});
        assert!(!entry.verify_hash(&EntryHasher::SHA256));
    }

    #[test]
    fn persisted_key_order() {
        let entry = Entry::genesis(TS, &EntryHasher::SHA256).unwrap();
        let text = serde_json::to_string(&entry).unwrap();
        let positions: Vec<usize> = ["\"index\"", "\"timestamp\"", "\"data\"", "\"previous_hash\"", "\"hash\""]
            .iter()
            .map(|k| text.find(k).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn short_hash_is_prefix() {
        let entry = Entry::genesis(TS, &EntryHasher::SHA256).unwrap();
        assert_eq!(entry.short_hash().len(), 12);
        assert!(entry.hash.starts_with(entry.short_hash()));
    }
}
