//! Conversion backends — one capability per conversion kind.
//!
//! # Architecture
//!
//! ```text
//! SelectedFile + Settings
//!        │
//!        ▼
//! BackendJob::prepare(kind, …)      ← kind-appropriate input
//!        │
//!        ▼
//! Backends::dispatch(job)
//!        ├─ Document       → DocumentBackend::convert(DocumentInput)
//!        ├─ TextExtraction → TextExtractionBackend::convert(ImageInput)
//!        └─ Speech         → SpeechBackend::convert(SpeechInput)
//!                                   │
//!                                   ▼
//!                           ConversionResult
//! ```
//!
//! Backends only produce a [`ConversionResult`]; they never write to the
//! history or the artifact vault.  Failures are reported in-band through
//! `success = false` and `error_message`.

pub mod document;
pub mod ocr;
pub mod process;
pub mod speech;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{EngineConfig, OcrLanguage, Orientation, PageSize, Settings, Voice};
use crate::convert::SelectedFile;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use document::PdfBackend;
pub use ocr::TesseractBackend;
pub use speech::EspeakBackend;

// ---------------------------------------------------------------------------
// Kinds and output types
// ---------------------------------------------------------------------------

/// The conversions the application offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// Text → paginated document.
    Document,
    /// Image → extracted text.
    TextExtraction,
    /// Text → spoken audio.
    Speech,
}

impl ConversionKind {
    /// File type of the artifact this kind produces.
    pub fn output_type(self) -> FileType {
        match self {
            ConversionKind::Document => FileType::Document,
            ConversionKind::TextExtraction => FileType::Text,
            ConversionKind::Speech => FileType::Audio,
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            ConversionKind::Document => "PDF",
            ConversionKind::TextExtraction => "OCR (text)",
            ConversionKind::Speech => "Audio",
        }
    }
}

/// Type of a produced file.  Serialised with the short tags used in the
/// history file (`pdf`, `txt`, `mp3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = "pdf")]
    Document,
    #[serde(rename = "txt")]
    Text,
    #[serde(rename = "mp3")]
    Audio,
}

impl FileType {
    /// History tag for this type.
    pub fn tag(self) -> &'static str {
        match self {
            FileType::Document => "pdf",
            FileType::Text => "txt",
            FileType::Audio => "mp3",
        }
    }
}

// ---------------------------------------------------------------------------
// ConversionResult
// ---------------------------------------------------------------------------

/// What a backend hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub success: bool,
    /// Name of the produced file (or of the input, on failure).
    pub file_name: String,
    pub file_type: FileType,
    /// Size of `blob` in bytes; `0` on failure.
    pub file_size: u64,
    /// The produced file.
    pub blob: Option<Vec<u8>>,
    pub error_message: Option<String>,
}

impl ConversionResult {
    /// A successful conversion producing `blob`.
    pub fn completed(file_name: impl Into<String>, file_type: FileType, blob: Vec<u8>) -> Self {
        Self {
            success: true,
            file_name: file_name.into(),
            file_type,
            file_size: blob.len() as u64,
            blob: Some(blob),
            error_message: None,
        }
    }

    /// A failed conversion with a user-facing message.
    pub fn failed(
        file_name: impl Into<String>,
        file_type: FileType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            file_name: file_name.into(),
            file_type,
            file_size: 0,
            blob: None,
            error_message: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend inputs
// ---------------------------------------------------------------------------

/// Page geometry and typography for generated documents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin_mm: f32,
    pub font_size: f32,
}

/// Input of the document backend.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInput {
    /// Source file name without its extension.
    pub stem: String,
    pub text: String,
    pub layout: PageLayout,
}

/// Input of the text-extraction backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub language: OcrLanguage,
    pub precise: bool,
}

/// Input of the speech backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechInput {
    /// Source file name without its extension.
    pub stem: String,
    pub text: String,
    pub voice: Voice,
    /// Rate multiplier, `1.0` = engine default.
    pub rate: f32,
}

/// A kind-tagged backend input.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendJob {
    Document(DocumentInput),
    TextExtraction(ImageInput),
    Speech(SpeechInput),
}

impl BackendJob {
    /// Build the input for `kind` from the selected file and the settings
    /// in force.  Text inputs are decoded as UTF-8, invalid sequences
    /// replaced.
    pub fn prepare(kind: ConversionKind, file: &SelectedFile, settings: &Settings) -> Self {
        match kind {
            ConversionKind::Document => BackendJob::Document(DocumentInput {
                stem: file_stem(&file.name).to_string(),
                text: String::from_utf8_lossy(&file.bytes).into_owned(),
                layout: PageLayout {
                    page_size: settings.page_size,
                    orientation: settings.orientation,
                    margin_mm: settings.margin_mm,
                    font_size: settings.font_size,
                },
            }),
            ConversionKind::TextExtraction => BackendJob::TextExtraction(ImageInput {
                file_name: file.name.clone(),
                mime: file.mime.clone(),
                bytes: file.bytes.clone(),
                language: settings.ocr_language,
                precise: settings.ocr_precise,
            }),
            ConversionKind::Speech => BackendJob::Speech(SpeechInput {
                stem: file_stem(&file.name).to_string(),
                text: String::from_utf8_lossy(&file.bytes).into_owned(),
                voice: settings.voice,
                rate: settings.speech_rate,
            }),
        }
    }

    pub fn kind(&self) -> ConversionKind {
        match self {
            BackendJob::Document(_) => ConversionKind::Document,
            BackendJob::TextExtraction(_) => ConversionKind::TextExtraction,
            BackendJob::Speech(_) => ConversionKind::Speech,
        }
    }
}

/// Strip the last extension: `notes.txt` → `notes`, `a.tar.gz` → `a.tar`.
///
/// Names that are nothing but an extension (`.profile`) are kept whole.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) if name[i + 1..].is_empty() || name[i..].contains(['/', '\\']) => name,
        Some(i) => &name[..i],
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Turns text into a paginated document.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn convert(&self, input: DocumentInput) -> ConversionResult;
}

/// Extracts text from an image.
#[async_trait]
pub trait TextExtractionBackend: Send + Sync {
    async fn convert(&self, input: ImageInput) -> ConversionResult;
}

/// Synthesises speech from text.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn convert(&self, input: SpeechInput) -> ConversionResult;
}

// Compile-time assertion: the capability traits must be object-safe.
const _: fn() = || {
    fn _assert_object_safe(
        _: Box<dyn DocumentBackend>,
        _: Box<dyn TextExtractionBackend>,
        _: Box<dyn SpeechBackend>,
    ) {
    }
};

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors raised inside the built-in backends before they are folded into a
/// failed [`ConversionResult`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input cannot be handled by this backend.
    #[error("{0}")]
    InvalidInput(String),

    /// The engine ran but produced nothing usable.
    #[error("{0}")]
    EmptyOutput(String),

    /// The engine program could not be started.
    #[error("could not start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited unsuccessfully.
    #[error("{program} failed: {stderr}")]
    Failed { program: String, stderr: String },

    /// Piping data to or from the engine failed.
    #[error("engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking worker panicked or was cancelled.
    #[error("engine worker stopped: {0}")]
    Worker(String),
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// The fixed set of backends, one per [`ConversionKind`].
///
/// Cheap to clone; all backends are held behind `Arc`.
#[derive(Clone)]
pub struct Backends {
    document: Arc<dyn DocumentBackend>,
    text_extraction: Arc<dyn TextExtractionBackend>,
    speech: Arc<dyn SpeechBackend>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

impl Backends {
    pub fn new(
        document: Arc<dyn DocumentBackend>,
        text_extraction: Arc<dyn TextExtractionBackend>,
        speech: Arc<dyn SpeechBackend>,
    ) -> Self {
        Self {
            document,
            text_extraction,
            speech,
        }
    }

    /// The built-in on-device backends, using the programs named in
    /// `engines`.
    pub fn local(engines: &EngineConfig) -> Self {
        Self::new(
            Arc::new(PdfBackend),
            Arc::new(TesseractBackend::new(&engines.tesseract)),
            Arc::new(EspeakBackend::new(&engines.espeak, &engines.speech_language)),
        )
    }

    /// Route `job` to the backend of its kind.
    pub async fn dispatch(&self, job: BackendJob) -> ConversionResult {
        log::debug!("backend: dispatching {:?} job", job.kind());
        match job {
            BackendJob::Document(input) => self.document.convert(input).await,
            BackendJob::TextExtraction(input) => self.text_extraction.convert(input).await,
            BackendJob::Speech(input) => self.speech.convert(input).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl DocumentBackend for Named {
        async fn convert(&self, input: DocumentInput) -> ConversionResult {
            ConversionResult::completed(
                format!("{}-{}", self.0, input.stem),
                FileType::Document,
                input.text.into_bytes(),
            )
        }
    }

    #[async_trait]
    impl TextExtractionBackend for Named {
        async fn convert(&self, input: ImageInput) -> ConversionResult {
            ConversionResult::completed(
                format!("{}-{}", self.0, input.file_name),
                FileType::Text,
                Vec::new(),
            )
        }
    }

    #[async_trait]
    impl SpeechBackend for Named {
        async fn convert(&self, input: SpeechInput) -> ConversionResult {
            ConversionResult::completed(
                format!("{}-{}", self.0, input.stem),
                FileType::Audio,
                Vec::new(),
            )
        }
    }

    fn backends() -> Backends {
        Backends::new(
            Arc::new(Named("doc")),
            Arc::new(Named("ocr")),
            Arc::new(Named("tts")),
        )
    }

    fn text_file() -> SelectedFile {
        SelectedFile::new("notes.txt", "text/plain", b"hello".to_vec())
    }

    #[test]
    fn kinds_map_to_output_types() {
        assert_eq!(ConversionKind::Document.output_type(), FileType::Document);
        assert_eq!(ConversionKind::TextExtraction.output_type(), FileType::Text);
        assert_eq!(ConversionKind::Speech.output_type(), FileType::Audio);
    }

    #[test]
    fn file_type_tags() {
        for t in [FileType::Document, FileType::Text, FileType::Audio] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.tag()));
        }
        assert_eq!(FileType::Audio.tag(), "mp3");
    }

    #[test]
    fn file_stem_strips_last_extension() {
        assert_eq!(file_stem("notes.txt"), "notes");
        assert_eq!(file_stem("a.tar.gz"), "a.tar");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".profile"), ".profile");
        assert_eq!(file_stem("trailing."), "trailing.");
    }

    #[test]
    fn completed_and_failed_results() {
        let ok = ConversionResult::completed("a.pdf", FileType::Document, vec![1, 2, 3]);
        assert!(ok.success);
        assert_eq!(ok.file_size, 3);
        assert!(ok.error_message.is_none());

        let err = ConversionResult::failed("a.png", FileType::Text, "boom");
        assert!(!err.success);
        assert_eq!(err.file_size, 0);
        assert!(err.blob.is_none());
        assert_eq!(err.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn prepare_uses_settings() {
        let mut settings = Settings::default();
        settings.page_size = PageSize::A3;
        settings.font_size = 14.0;
        settings.voice = Voice::Female;
        settings.speech_rate = 1.2;

        match BackendJob::prepare(ConversionKind::Document, &text_file(), &settings) {
            BackendJob::Document(input) => {
                assert_eq!(input.stem, "notes");
                assert_eq!(input.text, "hello");
                assert_eq!(input.layout.page_size, PageSize::A3);
                assert_eq!(input.layout.font_size, 14.0);
            }
            other => panic!("unexpected job {other:?}"),
        }

        match BackendJob::prepare(ConversionKind::Speech, &text_file(), &settings) {
            BackendJob::Speech(input) => {
                assert_eq!(input.voice, Voice::Female);
                assert_eq!(input.rate, 1.2);
            }
            other => panic!("unexpected job {other:?}"),
        }

        let image = SelectedFile::new("scan.png", "image/png", vec![0x89, b'P']);
        match BackendJob::prepare(ConversionKind::TextExtraction, &image, &settings) {
            BackendJob::TextExtraction(input) => {
                assert_eq!(input.file_name, "scan.png");
                assert_eq!(input.language, OcrLanguage::Por);
                assert!(input.precise);
            }
            other => panic!("unexpected job {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let file = SelectedFile::new("bad.txt", "text/plain", vec![b'o', b'k', 0xff]);
        let job = BackendJob::prepare(ConversionKind::Document, &file, &Settings::default());
        let BackendJob::Document(input) = job else {
            panic!("expected document job");
        };
        assert_eq!(input.text, "ok\u{FFFD}");
    }

    #[tokio::test]
    async fn dispatch_routes_by_kind() {
        let backends = backends();
        let settings = Settings::default();
        let image = SelectedFile::new("scan.png", "image/png", Vec::new());

        let doc = backends
            .dispatch(BackendJob::prepare(ConversionKind::Document, &text_file(), &settings))
            .await;
        assert_eq!(doc.file_name, "doc-notes");

        let ocr = backends
            .dispatch(BackendJob::prepare(ConversionKind::TextExtraction, &image, &settings))
            .await;
        assert_eq!(ocr.file_name, "ocr-scan.png");

        let tts = backends
            .dispatch(BackendJob::prepare(ConversionKind::Speech, &text_file(), &settings))
            .await;
        assert_eq!(tts.file_name, "tts-notes");
    }
}
