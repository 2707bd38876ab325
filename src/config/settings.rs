//! User settings, their hard-coded defaults and TOML persistence.
//!
//! [`Settings`] is the singleton record every conversion reads.
//! [`SettingsStore`] owns the on-disk copy and a cached value so that
//! [`SettingsStore::get`] never fails and never hands out a partially
//! populated record: keys missing from the file are filled from
//! [`Settings::default`] and an unreadable file falls back to the defaults.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// Gender of the synthesised voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Male,
    Female,
}

/// Language model used for text extraction (Tesseract language codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    /// Portuguese.
    #[default]
    Por,
    /// English.
    Eng,
    /// Spanish.
    Spa,
    /// French.
    Fra,
}

impl OcrLanguage {
    /// Three-letter code understood by the OCR engine.
    pub fn code(self) -> &'static str {
        match self {
            OcrLanguage::Por => "por",
            OcrLanguage::Eng => "eng",
            OcrLanguage::Spa => "spa",
            OcrLanguage::Fra => "fra",
        }
    }
}

/// Paper format of generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    A3,
}

impl PageSize {
    /// Portrait `(width, height)` in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::A3 => (297.0, 420.0),
        }
    }
}

/// Page orientation of generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Local programs backing the built-in OCR and speech backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Tesseract executable name or path.
    pub tesseract: String,
    /// eSpeak NG executable name or path.
    pub espeak: String,
    /// eSpeak voice language, combined with the gender variant.
    pub speech_language: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tesseract: "tesseract".into(),
            espeak: "espeak-ng".into(),
            speech_language: "pt-br".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User-configurable conversion parameters, serialised as `settings.toml`.
///
/// Values are stored as given; no range checks are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Voice used by the speech backend.
    pub voice: Voice,
    /// Speech rate multiplier (`1.0` = engine default).
    pub speech_rate: f32,
    /// OCR language.
    pub ocr_language: OcrLanguage,
    /// Slower, more accurate OCR mode.
    pub ocr_precise: bool,
    /// Document paper format.
    pub page_size: PageSize,
    /// Document orientation.
    pub orientation: Orientation,
    /// Document margin on every side, in millimetres.
    pub margin_mm: f32,
    /// Document font size in points.
    pub font_size: f32,
    /// Whether successful conversions are recorded in the history.
    pub save_history: bool,
    /// Local engine programs.
    pub engines: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            voice: Voice::Male,
            speech_rate: 1.0,
            ocr_language: OcrLanguage::Por,
            ocr_precise: true,
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 20.0,
            font_size: 12.0,
            save_history: true,
            engines: EngineConfig::default(),
        }
    }
}

impl Settings {
    /// Load from an explicit path.
    ///
    /// Returns `Ok(Settings::default())` when the file does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Durable owner of the application's [`Settings`].
///
/// One instance per running application, shared as `Arc<SettingsStore>`.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl SettingsStore {
    /// Open the store backed by `path`.
    ///
    /// A missing file yields defaults.  A corrupt file is logged and also
    /// yields defaults; it is only overwritten by the next `set`/`reset`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match Settings::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "settings: could not read {} ({e}), using defaults",
                    path.display()
                );
                Settings::default()
            }
        };
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    /// Current settings, always fully populated.
    pub fn get(&self) -> Settings {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the settings wholesale and persist them.
    ///
    /// The cached value only changes once the file has been written.
    pub fn set(&self, settings: Settings) -> Result<()> {
        settings.save_to(&self.path)?;
        log::info!("settings: saved to {}", self.path.display());
        match self.current.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
        Ok(())
    }

    /// Restore and persist the hard-coded defaults.
    pub fn reset(&self) -> Result<()> {
        self.set(Settings::default())?;
        log::info!("settings: reset to defaults");
        Ok(())
    }

    /// Returns `true` when settings have been saved at least once.
    pub fn has_saved(&self) -> bool {
        self.path.exists()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn first_access_returns_exact_defaults() {
        let dir = tempdir().expect("temp dir");
        let store = SettingsStore::open(dir.path().join("settings.toml"));

        let s = store.get();
        assert_eq!(s.voice, Voice::Male);
        assert_eq!(s.speech_rate, 1.0);
        assert_eq!(s.ocr_language, OcrLanguage::Por);
        assert!(s.ocr_precise);
        assert_eq!(s.page_size, PageSize::A4);
        assert_eq!(s.orientation, Orientation::Portrait);
        assert_eq!(s.margin_mm, 20.0);
        assert_eq!(s.font_size, 12.0);
        assert!(s.save_history);
        assert!(!store.has_saved());
    }

    #[test]
    fn set_persists_across_reopen() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.toml");

        let store = SettingsStore::open(&path);
        let mut s = store.get();
        s.voice = Voice::Female;
        s.speech_rate = 1.5;
        s.ocr_language = OcrLanguage::Fra;
        s.page_size = PageSize::Letter;
        s.orientation = Orientation::Landscape;
        s.save_history = false;
        store.set(s.clone()).expect("set");

        assert_eq!(store.get(), s);
        let reopened = SettingsStore::open(&path);
        assert_eq!(reopened.get(), s);
    }

    #[test]
    fn reset_restores_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        let store = SettingsStore::open(&path);

        let mut s = store.get();
        s.font_size = 30.0;
        store.set(s).expect("set");
        store.reset().expect("reset");

        assert_eq!(store.get(), Settings::default());
        assert_eq!(SettingsStore::open(&path).get(), Settings::default());
    }

    #[test]
    fn failed_reset_keeps_current_settings() {
        let dir = tempdir().expect("temp dir");
        let cfg = dir.path().join("cfg");
        let store = SettingsStore::open(cfg.join("settings.toml"));

        let mut s = store.get();
        s.font_size = 30.0;
        store.set(s.clone()).expect("set");

        // A plain file where the config directory was makes the write fail.
        std::fs::remove_dir_all(&cfg).unwrap();
        std::fs::write(&cfg, "not a directory").unwrap();

        assert!(store.reset().is_err());
        assert_eq!(store.get(), s);
    }

    #[test]
    fn partial_file_is_completed_from_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "voice = \"female\"\nmarginMm = 5.0\n").unwrap();

        let s = SettingsStore::open(&path).get();
        assert_eq!(s.voice, Voice::Female);
        assert_eq!(s.margin_mm, 5.0);
        assert_eq!(s.font_size, 12.0);
        assert!(s.save_history);
        assert_eq!(s.engines, EngineConfig::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        assert_eq!(SettingsStore::open(&path).get(), Settings::default());
    }

    #[test]
    fn file_uses_camel_case_keys() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");
        Settings::default().save_to(&path).expect("save");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("speechRate"));
        assert!(text.contains("ocrLanguage = \"por\""));
        assert!(text.contains("pageSize = \"A4\""));
        assert!(text.contains("saveHistory = true"));
    }

    #[test]
    fn page_dimensions() {
        assert_eq!(PageSize::A4.dimensions_mm(), (210.0, 297.0));
        assert_eq!(PageSize::A3.dimensions_mm(), (297.0, 420.0));
    }
}
