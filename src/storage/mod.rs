//! Local persistence for conversion history and produced artifacts.
//!
//! * [`HistoryLedger`]: newest-first list of [`HistoryEntry`] records,
//!   capped at [`MAX_HISTORY_ENTRIES`], persisted as JSON.
//! * [`ArtifactVault`]: base64 text-encoded blobs keyed by history id,
//!   capped per artifact at [`MAX_ARTIFACT_BYTES`].
//!
//! Removing a history entry always removes its artifact; clearing the
//! history leaves the vault alone.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use convert_easy::config::{AppPaths, SettingsStore};
//! use convert_easy::storage::{ArtifactVault, HistoryLedger};
//!
//! let paths = AppPaths::new();
//! let settings = Arc::new(SettingsStore::open(&paths.settings_file));
//! let vault = Arc::new(ArtifactVault::open(&paths.artifacts_dir));
//! let ledger = HistoryLedger::open(&paths.history_file, settings, Arc::clone(&vault));
//!
//! for entry in ledger.list() {
//!     println!("{} {} {}", entry.id, entry.file_name, vault.exists(&entry.id));
//! }
//! ```

pub mod history;
pub mod vault;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use history::{EntryStatus, HistoryEntry, HistoryLedger, NewHistoryEntry, MAX_HISTORY_ENTRIES};
pub use vault::{ArtifactVault, MAX_ARTIFACT_BYTES};

/// Errors raised while persisting the history ledger.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history file could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

/// Human-readable byte count with binary units, e.g. `1.5 KB`.
///
/// ```
/// use convert_easy::storage::format_file_size;
///
/// assert_eq!(format_file_size(0), "0 Bytes");
/// assert_eq!(format_file_size(1536), "1.5 KB");
/// assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
/// ```
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".into();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}
