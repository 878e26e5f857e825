use std::path::{Path, PathBuf};

use auditchain_crypto::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Default ledger file name, relative to the working directory.
pub const DEFAULT_LEDGER_FILE: &str = "blockchain_data.json";

/// Flush/sync strategy for ledger writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` the file and its directory after every write.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering.
    OsDefault,
}

/// Ledger configuration, loadable from TOML.
///
/// ```toml
/// path = "/var/lib/shop/blockchain_data.json"
/// digest = "sha256"
/// sync_mode = "every_write"
/// persist_retries = 2
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Location of the JSON ledger file.
    pub path: PathBuf,
    /// Digest algorithm for entry hashes.
    pub digest: DigestAlgorithm,
    pub sync_mode: SyncMode,
    /// Pretty-print the ledger file with 4-space indentation.
    pub pretty: bool,
    /// Move an unreadable ledger file aside instead of overwriting it.
    pub preserve_invalid: bool,
    /// Verify the loaded chain at startup and log any violations.
    pub verify_on_load: bool,
    /// Extra attempts at the persistence write before an append fails.
    pub persist_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LEDGER_FILE),
            digest: DigestAlgorithm::default(),
            sync_mode: SyncMode::default(),
            pretty: true,
            preserve_invalid: true,
            verify_on_load: true,
            persist_retries: 0,
        }
    }
}

impl LedgerConfig {
    /// Default configuration for a ledger at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, LedgerError> {
        toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))
    }

    /// Read configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, LedgerError> {
        toml::to_string(self).map_err(|e| LedgerError::Config(e.to_string()))
    }
}
