//! Text extraction through a local Tesseract install.
//!
//! The image is streamed to `tesseract stdin stdout -l <lang>`; recognised
//! text comes back on stdout and becomes `<stem>_ocr.txt`.

use async_trait::async_trait;

use super::process::run_engine;
use super::{file_stem, ConversionResult, EngineError, FileType, ImageInput, TextExtractionBackend};

/// [`TextExtractionBackend`] backed by the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractBackend {
    program: String,
}

impl TesseractBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command-line arguments for one recognition run.
    ///
    /// Precise mode pins the LSTM engine with full page segmentation; fast
    /// mode treats the image as a single uniform block of text.
    pub fn args(input: &ImageInput) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "stdin".into(),
            "stdout".into(),
            "-l".into(),
            input.language.code().into(),
        ];
        if input.precise {
            args.extend(["--oem", "1", "--psm", "3"].map(String::from));
        } else {
            args.extend(["--psm", "6"].map(String::from));
        }
        args
    }

    async fn recognize(&self, input: ImageInput) -> Result<String, EngineError> {
        if !input.mime.starts_with("image/") {
            return Err(EngineError::InvalidInput("File is not a valid image".into()));
        }
        let args = Self::args(&input);
        let stdout = run_engine(&self.program, &args, input.bytes).await?;
        let text = String::from_utf8_lossy(&stdout).trim().to_string();
        if text.is_empty() {
            return Err(EngineError::EmptyOutput("No text found in the image".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextExtractionBackend for TesseractBackend {
    async fn convert(&self, input: ImageInput) -> ConversionResult {
        let source_name = input.file_name.clone();
        let file_name = format!("{}_ocr.txt", file_stem(&source_name));

        match self.recognize(input).await {
            Ok(text) => {
                log::info!("ocr: extracted {} chars from {source_name}", text.chars().count());
                ConversionResult::completed(file_name, FileType::Text, text.into_bytes())
            }
            Err(e) => {
                log::warn!("ocr: {source_name}: {e}");
                ConversionResult::failed(source_name, FileType::Text, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OcrLanguage;

    fn image(mime: &str) -> ImageInput {
        ImageInput {
            file_name: "receipt.png".into(),
            mime: mime.into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
            language: OcrLanguage::Eng,
            precise: true,
        }
    }

    #[test]
    fn args_follow_language_and_precision() {
        let precise = TesseractBackend::args(&image("image/png"));
        assert_eq!(precise[..4], ["stdin", "stdout", "-l", "eng"]);
        assert!(precise.contains(&"--oem".to_string()));

        let mut fast_input = image("image/png");
        fast_input.precise = false;
        fast_input.language = OcrLanguage::Spa;
        let fast = TesseractBackend::args(&fast_input);
        assert!(fast.contains(&"spa".to_string()));
        assert!(fast.contains(&"6".to_string()));
        assert!(!fast.contains(&"--oem".to_string()));
    }

    #[tokio::test]
    async fn non_image_is_rejected_without_running_engine() {
        let backend = TesseractBackend::new("/nonexistent/tesseract");
        let result = backend.convert(image("text/plain")).await;
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("File is not a valid image"));
        assert_eq!(result.file_name, "receipt.png");
        assert_eq!(result.file_type, FileType::Text);
    }

    #[tokio::test]
    async fn missing_engine_reports_failure() {
        let backend = TesseractBackend::new("/nonexistent/tesseract");
        let result = backend.convert(image("image/png")).await;
        assert!(!result.success);
        assert!(result
            .error_message
            .unwrap()
            .contains("/nonexistent/tesseract"));
    }
}
