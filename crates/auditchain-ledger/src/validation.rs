use auditchain_crypto::{ChainError, EntryHasher, HashChainVerifier};
use serde::Serialize;

use crate::entry::Entry;
use crate::error::LedgerError;

/// Result of chain verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub entry_count: u64,
    pub head_hash: Option<String>,
    pub genesis_valid: bool,
    pub indices_contiguous: bool,
    pub hash_chain_valid: bool,
    pub violations: Vec<Violation>,
}

impl VerificationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The first violation as an error, if any.
    pub fn into_result(self) -> Result<(), LedgerError> {
        match self.violations.into_iter().next() {
            None => Ok(()),
            Some(v) => Err(LedgerError::IntegrityViolation {
                index: v.index,
                reason: v.description,
            }),
        }
    }
}

/// A specific integrity violation detected during verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub index: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    IndexGap,
    GenesisMalformed,
    HashChainBreak,
    HashMismatch,
}

/// Verify a sequence of entries against every chain invariant.
///
/// An empty sequence is reported as a malformed genesis: a ledger always
/// holds at least its genesis entry.
pub fn verify_entries(entries: &[Entry], hasher: &EntryHasher) -> VerificationReport {
    let mut report = VerificationReport {
        entry_count: entries.len() as u64,
        head_hash: entries.last().map(|e| e.hash.clone()),
        genesis_valid: true,
        indices_contiguous: true,
        hash_chain_valid: true,
        violations: Vec::new(),
    };

    if entries.is_empty() {
        report.genesis_valid = false;
        report.violations.push(Violation {
            index: 0,
            kind: ViolationKind::GenesisMalformed,
            description: "ledger has no genesis entry".into(),
        });
        return report;
    }

    for err in HashChainVerifier::scan(entries, hasher) {
        let kind = match &err {
            ChainError::GenesisPrevHash { .. } => {
                report.genesis_valid = false;
                ViolationKind::GenesisMalformed
            }
            ChainError::IndexGap { .. } => {
                report.indices_contiguous = false;
                ViolationKind::IndexGap
            }
            ChainError::BrokenLink { .. } => {
                report.hash_chain_valid = false;
                ViolationKind::HashChainBreak
            }
            ChainError::HashMismatch { .. } | ChainError::Digest { .. } => {
                report.hash_chain_valid = false;
                ViolationKind::HashMismatch
            }
        };
        report.violations.push(Violation {
            index: err.index(),
            kind,
            description: err.to_string(),
        });
    }

    report
}
