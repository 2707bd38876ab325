//! Conversion orchestrator — drives validate → convert → persist → handoff.
//!
//! [`ConversionOrchestrator`] owns one conversion session and handles to the
//! shared stores.  It is the only writer of the history ledger and the
//! artifact vault.
//!
//! # Conversion flow
//!
//! ```text
//! convert()
//!   └─▶ check (file, kind) compatibility            [Validating]
//!         ├─ mismatch → Failed, no backend call
//!         └─▶ tokio::spawn(backends.dispatch(job))  [Converting]
//!               ├─ failure / panic → Failed, history untouched
//!               └─ success
//!                    ├─ spawn_blocking(ledger.append)
//!                    ├─ spawn_blocking(vault.put)   best-effort
//!                    └─▶ ConversionOutcome          [Completed]
//! ```
//!
//! The session lock is a `std::sync::Mutex` held only for short critical
//! sections, never across `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::{file_stem, BackendJob, Backends, ConversionKind, ConversionResult};
use crate::config::SettingsStore;
use crate::storage::{ArtifactVault, EntryStatus, HistoryLedger, NewHistoryEntry};

use super::state::{
    check_compatibility, check_size, ConversionState, ConvertError, ValidationError,
    GENERIC_FAILURE,
};
use super::SelectedFile;

// ---------------------------------------------------------------------------
// ConversionOutcome
// ---------------------------------------------------------------------------

/// Everything the presentation layer receives after a successful conversion.
///
/// `result.blob` is the freshly produced file held in memory; it is handed
/// over even when the vault declined to keep a copy.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub result: ConversionResult,
    /// Id of the history entry, `None` when history saving is disabled or
    /// the entry could not be written.
    pub history_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Session {
    state: ConversionState,
    file: Option<Arc<SelectedFile>>,
    kind: Option<ConversionKind>,
    last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// ConversionOrchestrator
// ---------------------------------------------------------------------------

/// Drives a single conversion session at a time.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use convert_easy::backend::{Backends, ConversionKind};
/// use convert_easy::config::{AppPaths, SettingsStore};
/// use convert_easy::convert::{ConversionOrchestrator, SelectedFile};
/// use convert_easy::storage::{ArtifactVault, HistoryLedger};
///
/// # async fn example() -> anyhow::Result<()> {
/// let paths = AppPaths::new();
/// let settings = Arc::new(SettingsStore::open(&paths.settings_file));
/// let vault = Arc::new(ArtifactVault::open(&paths.artifacts_dir));
/// let ledger = Arc::new(HistoryLedger::open(
///     &paths.history_file,
///     Arc::clone(&settings),
///     Arc::clone(&vault),
/// ));
/// let backends = Backends::local(&settings.get().engines);
///
/// let orchestrator = ConversionOrchestrator::new(settings, ledger, vault, backends);
/// orchestrator.select_file(Some(SelectedFile::from_path("notes.txt").await?))?;
/// orchestrator.choose_kind(Some(ConversionKind::Document))?;
/// let outcome = orchestrator.convert().await?;
/// println!("{} ({} bytes)", outcome.result.file_name, outcome.result.file_size);
/// # Ok(())
/// # }
/// ```
pub struct ConversionOrchestrator {
    settings: Arc<SettingsStore>,
    ledger: Arc<HistoryLedger>,
    vault: Arc<ArtifactVault>,
    backends: Backends,
    session: Mutex<Session>,
}

impl std::fmt::Debug for ConversionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionOrchestrator")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ConversionOrchestrator {
    pub fn new(
        settings: Arc<SettingsStore>,
        ledger: Arc<HistoryLedger>,
        vault: Arc<ArtifactVault>,
        backends: Backends,
    ) -> Self {
        Self {
            settings,
            ledger,
            vault,
            backends,
            session: Mutex::new(Session::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current phase of the session.
    pub fn state(&self) -> ConversionState {
        self.lock().state
    }

    /// Message of the last rejected selection or failed conversion.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// The conversion kind currently chosen.
    pub fn selected_kind(&self) -> Option<ConversionKind> {
        self.lock().kind
    }

    /// Name of the currently selected file.
    pub fn selected_file_name(&self) -> Option<String> {
        self.lock().file.as_ref().map(|f| f.name.clone())
    }

    /// Saved artifact of a past conversion, for re-download.
    ///
    /// `None` when the artifact was never kept (too large, write failure,
    /// history disabled) or has since been deleted.
    pub fn redownload(&self, history_id: &str) -> Option<Vec<u8>> {
        self.vault.get(history_id)
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Pick the file to convert.
    ///
    /// A rejected pick (no file, over 10 MB) drops the previous selection
    /// and returns the session to `Idle`.  A new file clears any previously
    /// chosen kind.
    pub fn select_file(&self, file: Option<SelectedFile>) -> Result<(), ConvertError> {
        let mut session = self.lock();
        if session.state.is_busy() {
            return Err(ConvertError::Busy);
        }

        let checked = file
            .ok_or(ValidationError::MissingFile)
            .and_then(|f| check_size(&f).map(|_| f));
        let file = match checked {
            Ok(file) => file,
            Err(e) => {
                log::warn!("convert: file rejected: {e}");
                *session = Session {
                    last_error: Some(e.to_string()),
                    ..Session::default()
                };
                return Err(e.into());
            }
        };

        log::info!(
            "convert: selected {} ({} bytes, {})",
            file.name,
            file.size(),
            if file.mime.is_empty() { "unknown type" } else { &file.mime }
        );
        session.file = Some(Arc::new(file));
        session.kind = None;
        session.last_error = None;
        session.state = ConversionState::FileSelected;
        Ok(())
    }

    /// Pick the conversion kind for the selected file.
    pub fn choose_kind(&self, kind: Option<ConversionKind>) -> Result<(), ConvertError> {
        let mut session = self.lock();
        if session.state.is_busy() {
            return Err(ConvertError::Busy);
        }
        if session.file.is_none() {
            return Err(ValidationError::MissingFile.into());
        }
        let Some(kind) = kind else {
            session.last_error = Some(ValidationError::MissingKind.to_string());
            return Err(ValidationError::MissingKind.into());
        };

        log::debug!("convert: kind {kind:?} chosen");
        session.kind = Some(kind);
        session.last_error = None;
        session.state = ConversionState::TypeChosen;
        Ok(())
    }

    /// Forget the selection and return to `Idle`.
    pub fn reset(&self) -> Result<(), ConvertError> {
        let mut session = self.lock();
        if session.state.is_busy() {
            return Err(ConvertError::Busy);
        }
        *session = Session::default();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    /// Validate the selection, run the matching backend and persist the
    /// outcome.
    ///
    /// Returns [`ConvertError::Busy`] without side effects while another
    /// conversion on this orchestrator is in flight.  Dropping the returned
    /// future before it resolves leaves the session `Failed`.
    pub async fn convert(&self) -> Result<ConversionOutcome, ConvertError> {
        // ── 1. Claim the session ─────────────────────────────────────────
        let (file, kind) = {
            let mut session = self.lock();
            if session.state.is_busy() {
                return Err(ConvertError::Busy);
            }
            let Some(file) = session.file.clone() else {
                return Err(ValidationError::MissingFile.into());
            };
            let Some(kind) = session.kind else {
                return Err(ValidationError::MissingKind.into());
            };
            session.state = ConversionState::Validating;
            session.last_error = None;
            (file, kind)
        };
        let _claim = SessionClaim {
            session: &self.session,
        };

        // ── 2. Validate ──────────────────────────────────────────────────
        if let Err(e) = check_compatibility(&file, kind) {
            log::warn!("convert: {} cannot be used for {kind:?}: {e}", file.name);
            self.finish_failed(e.to_string());
            return Err(e.into());
        }

        // ── 3. Convert ───────────────────────────────────────────────────
        self.set_state(ConversionState::Converting);
        let settings = self.settings.get();
        let job = BackendJob::prepare(kind, &file, &settings);
        let backends = self.backends.clone();

        log::info!("convert: {} → {}", file.name, kind.label());
        let result = match tokio::spawn(async move { backends.dispatch(job).await }).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("convert: backend task failed: {e}");
                return Err(self.finish_failed(GENERIC_FAILURE.into()));
            }
        };

        if !result.success {
            let message = result
                .error_message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.into());
            return Err(self.finish_failed(message));
        }
        if result.blob.is_none() {
            return Err(self.finish_failed("The conversion produced no output file".into()));
        }

        // ── 4. Persist ───────────────────────────────────────────────────
        let history_id = self.persist(&file, kind, &result).await;

        // ── 5. Handoff ───────────────────────────────────────────────────
        self.set_state(ConversionState::Completed);
        log::info!(
            "convert: completed {} ({} bytes)",
            result.file_name,
            result.file_size
        );
        Ok(ConversionOutcome { result, history_id })
    }

    /// Record the conversion in the ledger, then try to keep the artifact.
    ///
    /// Neither step can fail the conversion.  The vault write only runs once
    /// the ledger has assigned an id, and its failure leaves the ledger entry
    /// in place.
    ///
    /// Text sources are recorded by stem, images by their full name.
    async fn persist(
        &self,
        file: &SelectedFile,
        kind: ConversionKind,
        result: &ConversionResult,
    ) -> Option<String> {
        let original_file_name = match kind {
            ConversionKind::Document | ConversionKind::Speech => file_stem(&file.name).to_string(),
            ConversionKind::TextExtraction => file.name.clone(),
        };
        let new = NewHistoryEntry {
            file_name: result.file_name.clone(),
            original_file_name,
            file_type: result.file_type,
            file_size: result.file_size,
            status: EntryStatus::Success,
        };

        let ledger = Arc::clone(&self.ledger);
        let entry = match tokio::task::spawn_blocking(move || ledger.append(new)).await {
            Ok(Ok(Some(entry))) => entry,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                log::error!("convert: history entry not written: {e}");
                return None;
            }
            Err(e) => {
                log::error!("convert: history task failed: {e}");
                return None;
            }
        };

        let blob = result.blob.clone().unwrap_or_default();
        let vault = Arc::clone(&self.vault);
        let id = entry.id.clone();
        match tokio::task::spawn_blocking(move || vault.put(&id, &blob)).await {
            Ok(true) => log::debug!("convert: artifact kept for {}", entry.id),
            Ok(false) => log::warn!(
                "convert: artifact for {} not kept, re-download unavailable",
                entry.id
            ),
            Err(e) => log::error!("convert: vault task failed: {e}"),
        }

        Some(entry.id)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn finish_failed(&self, message: String) -> ConvertError {
        log::error!("convert: failed: {message}");
        let mut session = self.lock();
        session.state = ConversionState::Failed;
        session.last_error = Some(message.clone());
        ConvertError::Backend(message)
    }

    fn set_state(&self, state: ConversionState) {
        self.lock().state = state;
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        lock_session(&self.session)
    }
}

fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    match session.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Held for the duration of a claimed conversion.  If the conversion future
/// is dropped mid-flight the session is moved to `Failed` instead of staying
/// busy.
struct SessionClaim<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for SessionClaim<'_> {
    fn drop(&mut self) {
        let mut session = lock_session(self.session);
        if session.state.is_busy() {
            log::warn!("convert: conversion abandoned before it finished");
            session.state = ConversionState::Failed;
            session.last_error = Some(GENERIC_FAILURE.into());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
