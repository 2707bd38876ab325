//! convert-easy — on-device file conversion with a local history.
//!
//! Text becomes a PDF document or spoken audio, images become extracted
//! text.  Every successful conversion is recorded in a capped history and
//! the produced file is kept for re-download when it is small enough.

pub mod backend;
pub mod cli;
pub mod config;
pub mod convert;
pub mod storage;
