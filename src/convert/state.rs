//! Conversion session state machine, validation rules and errors.
//!
//! ```text
//! Idle ──select_file──▶ FileSelected ──choose_kind──▶ TypeChosen
//!                                                        │ convert()
//!                                                        ▼
//!                                                    Validating
//!                          incompatible (file, kind) ─┤
//!                                                     ▼
//!                                                 Converting
//!                                   backend ok ─┬─ backend error / panic
//!                                               ▼          ▼
//!                                          Completed     Failed
//! Completed / Failed ──select_file / choose_kind──▶ next round
//! ```

use thiserror::Error;

use crate::backend::ConversionKind;

use super::SelectedFile;

/// Largest file accepted for conversion: 10 MB.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Message used when a backend fails without saying why.
pub const GENERIC_FAILURE: &str = "Could not convert the file";

// ---------------------------------------------------------------------------
// ConversionState
// ---------------------------------------------------------------------------

/// Phase of a conversion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionState {
    /// Nothing selected yet.
    #[default]
    Idle,
    /// A file within the size limit has been picked.
    FileSelected,
    /// A conversion kind has been picked for the file.
    TypeChosen,
    /// Checking that the file suits the kind.
    Validating,
    /// A backend call is in flight.
    Converting,
    /// The last conversion succeeded.
    Completed,
    /// The last conversion failed; see the session's error message.
    Failed,
}

impl ConversionState {
    /// Returns `true` while a conversion is in progress and the session must
    /// not be changed.
    ///
    /// ```
    /// use convert_easy::convert::ConversionState;
    ///
    /// assert!(!ConversionState::TypeChosen.is_busy());
    /// assert!(ConversionState::Validating.is_busy());
    /// assert!(ConversionState::Converting.is_busy());
    /// assert!(!ConversionState::Failed.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, ConversionState::Validating | ConversionState::Converting)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Problems with the user's selection.  Recoverable by selecting again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a file first")]
    MissingFile,

    #[error("The file must be at most 10 MB (got {size} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Please choose a conversion type (PDF, Text or Audio)")]
    MissingKind,

    #[error("{}", incompatible_message(.0))]
    Incompatible(ConversionKind),
}

fn incompatible_message(kind: &ConversionKind) -> &'static str {
    match kind {
        ConversionKind::Document => "To convert to PDF, select a text file (.txt)",
        ConversionKind::TextExtraction => "For OCR, select an image (JPG, PNG, etc.)",
        ConversionKind::Speech => "For text-to-speech, select a text file (.txt)",
    }
}

/// Every way a conversion request can end without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend reported failure (or crashed).
    #[error("{0}")]
    Backend(String),

    /// Another conversion is still running in this session.
    #[error("A conversion is already in progress")]
    Busy,
}

// ---------------------------------------------------------------------------
// Validation rules
// ---------------------------------------------------------------------------

/// Size check applied when a file is selected.
pub fn check_size(file: &SelectedFile) -> Result<(), ValidationError> {
    let size = file.size();
    if size > MAX_FILE_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            limit: MAX_FILE_BYTES,
        });
    }
    Ok(())
}

/// Whether `file` is acceptable input for `kind`.
pub fn check_compatibility(file: &SelectedFile, kind: ConversionKind) -> Result<(), ValidationError> {
    let ok = match kind {
        ConversionKind::Document | ConversionKind::Speech => file.is_text_like(),
        ConversionKind::TextExtraction => file.is_image(),
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::Incompatible(kind))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
