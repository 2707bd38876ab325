//! History ledger — the capped, newest-first list of past conversions.
//!
//! The ledger is loaded once from `history.json` and written through after
//! every mutation.  Only the conversion orchestrator appends; presentation
//! code lists, filters and removes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::FileType;
use crate::config::SettingsStore;

use super::{ArtifactVault, StorageError};

/// Maximum number of entries kept; the oldest are evicted first.
pub const MAX_HISTORY_ENTRIES: usize = 100;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Outcome recorded for a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Error,
}

/// A persisted conversion record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Unique id, also the artifact key in the vault.
    pub id: String,
    /// Name of the produced file.
    pub file_name: String,
    /// Name of the file the conversion started from.
    pub original_file_name: String,
    pub file_type: FileType,
    /// Size of the produced file in bytes.
    pub file_size: u64,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    pub status: EntryStatus,
}

/// An entry before the ledger has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub file_name: String,
    pub original_file_name: String,
    pub file_type: FileType,
    pub file_size: u64,
    pub status: EntryStatus,
}

// ---------------------------------------------------------------------------
// HistoryLedger
// ---------------------------------------------------------------------------

/// Capacity-bounded conversion history.
///
/// Holds the settings store (to honour `save_history`) and the vault (to
/// cascade deletes).  Shared as `Arc<HistoryLedger>`.
pub struct HistoryLedger {
    path: PathBuf,
    entries: Mutex<Vec<HistoryEntry>>,
    settings: Arc<SettingsStore>,
    vault: Arc<ArtifactVault>,
}

impl std::fmt::Debug for HistoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryLedger")
            .field("path", &self.path)
            .field("len", &self.count())
            .finish_non_exhaustive()
    }
}

impl HistoryLedger {
    /// Open the ledger backed by `path`.
    ///
    /// A missing file is an empty history; an unreadable one is logged and
    /// also treated as empty.
    pub fn open(
        path: impl Into<PathBuf>,
        settings: Arc<SettingsStore>,
        vault: Arc<ArtifactVault>,
    ) -> Self {
        let path = path.into();
        let mut entries = Self::load_entries(&path);
        entries.truncate(MAX_HISTORY_ENTRIES);
        Self {
            path,
            entries: Mutex::new(entries),
            settings,
            vault,
        }
    }

    fn load_entries(path: &Path) -> Vec<HistoryEntry> {
        if !path.exists() {
            return Vec::new();
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(StorageError::from)
            .and_then(|data| serde_json::from_str(&data).map_err(StorageError::from));
        match parsed {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("history: could not read {} ({e}), starting empty", path.display());
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Record a conversion at the head of the history.
    ///
    /// Returns `Ok(None)` without touching anything when history saving is
    /// disabled in the settings.  Entries pushed past
    /// [`MAX_HISTORY_ENTRIES`] are evicted together with their artifacts.
    pub fn append(&self, new: NewHistoryEntry) -> Result<Option<HistoryEntry>, StorageError> {
        if !self.settings.get().save_history {
            log::info!("history: saving disabled, {} not recorded", new.file_name);
            return Ok(None);
        }

        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            file_name: new.file_name,
            original_file_name: new.original_file_name,
            file_type: new.file_type,
            file_size: new.file_size,
            created_at: Utc::now(),
            status: new.status,
        };

        let evicted = {
            let mut entries = self.lock();
            let mut next = Vec::with_capacity(entries.len() + 1);
            next.push(entry.clone());
            next.extend(entries.iter().cloned());
            let evicted = if next.len() > MAX_HISTORY_ENTRIES {
                next.split_off(MAX_HISTORY_ENTRIES)
            } else {
                Vec::new()
            };
            self.persist(&next)?;
            *entries = next;
            evicted
        };

        for old in &evicted {
            log::debug!("history: evicted {}", old.id);
            self.vault.delete(&old.id);
        }

        log::info!("history: recorded {} ({})", entry.file_name, entry.id);
        Ok(Some(entry))
    }

    /// Delete the entry with `id` and its artifact.
    ///
    /// Idempotent: unknown ids still have any stray artifact removed.
    /// Returns whether an entry was removed.
    pub fn remove(&self, id: &str) -> Result<bool, StorageError> {
        let removed = {
            let mut entries = self.lock();
            let before = entries.len();
            let next: Vec<HistoryEntry> =
                entries.iter().filter(|e| e.id != id).cloned().collect();
            let removed = next.len() != before;
            if removed {
                self.persist(&next)?;
                *entries = next;
            }
            removed
        };

        self.vault.delete(id);
        if removed {
            log::info!("history: removed {id}");
        }
        Ok(removed)
    }

    /// Empty the history.  Artifacts stay in the vault.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.lock();
        self.persist(&[])?;
        entries.clear();
        log::info!("history: cleared");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of all entries, newest first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    /// Entries of one file type, newest first.
    pub fn filter_by_type(&self, file_type: FileType) -> Vec<HistoryEntry> {
        self.lock()
            .iter()
            .filter(|e| e.file_type == file_type)
            .cloned()
            .collect()
    }

    /// Look up a single entry.
    pub fn get(&self, id: &str) -> Option<HistoryEntry> {
        self.lock().iter().find(|e| e.id == id).cloned()
    }

    /// Number of entries.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<HistoryEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
