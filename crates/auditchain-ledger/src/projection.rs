use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::entry::Entry;

/// Action reported for the genesis entry.
pub const GENESIS_ACTION: &str = "genesis";
/// Action reported for payloads without a string `action` key.
pub const UNSPECIFIED_ACTION: &str = "unspecified";

/// Row in the audit index shown to operators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditIndexEntry {
    pub index: u64,
    pub timestamp: String,
    pub action: String,
    pub actor: Option<String>,
    pub hash: String,
}

/// Read-only summary of the audit trail.
///
/// Payloads stay opaque to the ledger; this projection only peeks at the
/// conventional `action`, `user` and `admin_user` keys when they exist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AuditIndex {
    pub entries: Vec<AuditIndexEntry>,
}

impl AuditIndex {
    pub fn build(entries: &[Entry]) -> Self {
        Self {
            entries: entries.iter().map(index_row).collect(),
        }
    }

    pub fn by_action(&self, action: &str) -> Vec<&AuditIndexEntry> {
        self.entries.iter().filter(|e| e.action == action).collect()
    }

    pub fn by_actor(&self, actor: &str) -> Vec<&AuditIndexEntry> {
        self.entries
            .iter()
            .filter(|e| e.actor.as_deref() == Some(actor))
            .collect()
    }

    /// Number of entries per action.
    pub fn actions(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.action.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn index_row(entry: &Entry) -> AuditIndexEntry {
    let action = if entry.is_genesis() {
        GENESIS_ACTION.to_string()
    } else {
        string_field(&entry.data, "action").unwrap_or_else(|| UNSPECIFIED_ACTION.to_string())
    };
    let actor = string_field(&entry.data, "user").or_else(|| string_field(&entry.data, "admin_user"));

    AuditIndexEntry {
        index: entry.index,
        timestamp: entry.timestamp.clone(),
        action,
        actor,
        hash: entry.hash.clone(),
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_string)
}
