//! Configuration module for convert-easy.
//!
//! Provides [`Settings`] (user conversion parameters) with its durable
//! [`SettingsStore`], and [`AppPaths`] for cross-platform data directories.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    EngineConfig, OcrLanguage, Orientation, PageSize, Settings, SettingsStore, Voice,
};
