//! Conversion sessions: file selection, validation and the orchestrator
//! that ties settings, backends and storage together.
//!
//! * [`SelectedFile`]: the user's pick, loaded in memory.
//! * [`ConversionState`]: phase of the single active session.
//! * [`ConversionOrchestrator`]: runs one conversion at a time and hands
//!   the result back as a [`ConversionOutcome`].

pub mod file;
pub mod orchestrator;
pub mod state;

pub use file::{guess_mime, SelectedFile};
pub use orchestrator::{ConversionOrchestrator, ConversionOutcome};
pub use state::{
    check_compatibility, check_size, ConversionState, ConvertError, ValidationError,
    GENERIC_FAILURE, MAX_FILE_BYTES,
};
