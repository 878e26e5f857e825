//! JSON file store.
//!
//! The whole ledger lives in one file holding a JSON array of entries. Every
//! persist rewrites it through a temporary file in the same directory that is
//! renamed over the target, so a crash mid-write leaves the previous version
//! intact.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::{LedgerConfig, SyncMode};
use crate::entry::Entry;
use crate::error::StoreError;
use crate::traits::EntryStore;

/// Single-file JSON store.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    sync_mode: SyncMode,
    pretty: bool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync_mode: SyncMode::default(),
            pretty: true,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            path: config.path.clone(),
            sync_mode: config.sync_mode,
            pretty: config.pretty,
        }
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode a ledger file body.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<Entry>, StoreError> {
        let entries: Vec<Entry> =
            serde_json::from_slice(bytes).map_err(|e| StoreError::Malformed {
                location: self.location(),
                reason: e.to_string(),
            })?;
        if entries.is_empty() {
            return Err(StoreError::Malformed {
                location: self.location(),
                reason: "ledger contains no entries".into(),
            });
        }
        Ok(entries)
    }

    fn encode<W: Write>(&self, writer: W, entries: &[Entry]) -> Result<(), StoreError> {
        let result = if self.pretty {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(writer, formatter);
            entries.serialize(&mut ser)
        } else {
            serde_json::to_writer(writer, entries)
        };
        result.map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Make a rename inside `dir` durable.
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

impl EntryStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<Entry>>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entries = self.decode(&bytes)?;
        debug!(path = %self.path.display(), entries = entries.len(), "ledger file loaded");
        Ok(Some(entries))
    }

    fn persist(&self, entries: &[Entry]) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.encode(&mut writer, entries)?;
            writer.flush()?;
        }
        if self.sync_mode == SyncMode::EveryWrite {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        if self.sync_mode == SyncMode::EveryWrite {
            // The new file is in place; a failed directory sync only leaves
            // the rename's durability to the OS.
            if let Err(e) = sync_dir(dir) {
                warn!(dir = %dir.display(), error = %e, "directory sync failed after ledger write");
            }
        }

        debug!(path = %self.path.display(), entries = entries.len(), "ledger file written");
        Ok(())
    }

    fn quarantine(&self) -> Result<Option<String>, StoreError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".into());
        let stamp = chrono::Utc::now().timestamp_millis();
        let target = self.path.with_file_name(format!("{file_name}.invalid-{stamp}"));
        fs::rename(&self.path, &target)?;
        warn!(from = %self.path.display(), to = %target.display(), "moved unreadable ledger file aside");
        Ok(Some(target.display().to_string()))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
