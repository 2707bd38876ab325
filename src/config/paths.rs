//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\convert-easy\
//!   macOS:   ~/Library/Application Support/convert-easy/
//!   Linux:   ~/.config/convert-easy/
//!
//! Data dir (history + saved artifacts):
//!   Windows: %LOCALAPPDATA%\convert-easy\
//!   macOS:   ~/Library/Application Support/convert-easy/
//!   Linux:   ~/.local/share/convert-easy/

use std::path::{Path, PathBuf};

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Full path to `history.json`.
    pub history_file: PathBuf,
    /// Directory holding one encoded file per saved artifact.
    pub artifacts_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "convert-easy";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self::from_dirs(&config_dir, &data_dir)
    }

    /// Lays every file out under a single root (useful for tests and
    /// portable installs).
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::from_dirs(&root.join("config"), &root.join("data"))
    }

    fn from_dirs(config_dir: &Path, data_dir: &Path) -> Self {
        let settings_file = config_dir.join("settings.toml");
        let history_file = data_dir.join("history.json");
        let artifacts_dir = data_dir.join("artifacts");

        Self {
            settings_file,
            history_file,
            artifacts_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
