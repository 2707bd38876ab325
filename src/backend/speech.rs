//! Speech synthesis through a local eSpeak NG install.
//!
//! Text is piped to `espeak-ng --stdin --stdout`, which writes a WAV file
//! to stdout.

use async_trait::async_trait;

use crate::config::Voice;

use super::process::run_engine;
use super::{ConversionResult, EngineError, FileType, SpeechBackend, SpeechInput};

/// eSpeak's default speaking rate in words per minute.
const BASE_WPM: f32 = 175.0;

/// [`SpeechBackend`] backed by the `espeak-ng` command-line tool.
#[derive(Debug, Clone)]
pub struct EspeakBackend {
    program: String,
    language: String,
}

impl EspeakBackend {
    pub fn new(program: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: language.into(),
        }
    }

    /// Command-line arguments for one synthesis run.
    pub fn args(&self, input: &SpeechInput) -> Vec<String> {
        let variant = match input.voice {
            Voice::Male => "m3",
            Voice::Female => "f3",
        };
        let wpm = (BASE_WPM * input.rate).round().max(1.0) as u32;
        vec![
            "--stdin".into(),
            "--stdout".into(),
            "-v".into(),
            format!("{}+{variant}", self.language),
            "-s".into(),
            wpm.to_string(),
        ]
    }

    async fn synthesize(&self, input: SpeechInput) -> Result<Vec<u8>, EngineError> {
        if input.text.trim().is_empty() {
            return Err(EngineError::InvalidInput("Text is empty".into()));
        }
        let args = self.args(&input);
        let audio = run_engine(&self.program, &args, input.text.into_bytes()).await?;
        if audio.is_empty() {
            return Err(EngineError::EmptyOutput("The speech engine produced no audio".into()));
        }
        Ok(audio)
    }
}

#[async_trait]
impl SpeechBackend for EspeakBackend {
    async fn convert(&self, input: SpeechInput) -> ConversionResult {
        let file_name = format!("{}.wav", input.stem);

        match self.synthesize(input).await {
            Ok(audio) => {
                log::info!("speech: synthesised {file_name} ({} bytes)", audio.len());
                ConversionResult::completed(file_name, FileType::Audio, audio)
            }
            Err(e) => {
                log::warn!("speech: {file_name}: {e}");
                ConversionResult::failed(file_name, FileType::Audio, e.to_string())
            }
        }
    }
}
