//! Transcriber trait and the Whisper implementation.
//!
//! [`Transcriber`] is object-safe and `Send + Sync` so it can sit behind an
//! `Arc<dyn Transcriber>` in the pipeline.
//!
//! [`WhisperTranscriber`] wraps a `whisper_rs::WhisperContext`.
//! [`LazyTranscriber`] defers loading it to the first transcription through a
//! [`ModelHandle`].

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::{read_wav_16k_mono, AudioError};
use crate::handle::ModelHandle;
use crate::stt::transcribe::TranscribeParams;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// The reference recording could not be decoded.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

pub trait Transcriber: Send + Sync {
    /// Transcribe the recording at `audio_path`.
    fn transcribe(&self, audio_path: &Path) -> Result<String, SttError>;
}

// Compile-time assertion: Box<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Transcriber>) {}
};

// ---------------------------------------------------------------------------
// WhisperTranscriber
// ---------------------------------------------------------------------------

/// A new `WhisperState` is created for every call, so the transcriber can be
/// shared across threads without locking.
pub struct WhisperTranscriber {
    ctx: WhisperContext,
    params: TranscribeParams,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs; the model
// weights are read-only after loading.
unsafe impl Send for WhisperTranscriber {}
unsafe impl Sync for WhisperTranscriber {}

impl WhisperTranscriber {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`]: `model_path` does not exist.
    /// - [`SttError::ContextInit`] : whisper-rs failed to load the file.
    pub fn load(model_path: impl AsRef<Path>, params: TranscribeParams) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        Ok(Self { ctx, params })
    }

    fn full_params(&self) -> FullParams<'_, '_> {
        let mut fp = FullParams::new(SamplingStrategy::BeamSearch {
            beam_size: self.params.beam_size,
            patience: -1.0,
        });

        let lang = (self.params.language != "auto").then_some(self.params.language.as_str());
        fp.set_language(lang);
        fp.set_n_threads(self.params.n_threads);
        fp.set_no_context(!self.params.condition_on_previous_text);
        fp.set_token_timestamps(self.params.token_timestamps);
        if let Some(prompt) = self.params.initial_prompt.as_deref() {
            fp.set_initial_prompt(prompt);
        }
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, SttError> {
        let audio = read_wav_16k_mono(audio_path)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        let started = std::time::Instant::now();
        state
            .full(self.full_params(), &audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut pieces = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;
            let text = text.trim();
            if !text.is_empty() {
                pieces.push(text.to_string());
            }
        }

        let transcript = pieces.join(" ");
        log::info!(
            "transcribed {} in {} ms: {transcript}",
            audio_path.display(),
            started.elapsed().as_millis()
        );
        Ok(transcript)
    }
}

// ---------------------------------------------------------------------------
// LazyTranscriber
// ---------------------------------------------------------------------------

/// Loads the Whisper model on first use.
pub struct LazyTranscriber {
    handle: ModelHandle<WhisperTranscriber, SttError>,
}

impl LazyTranscriber {
    pub fn new(model_path: impl AsRef<Path>, params: TranscribeParams) -> Self {
        let model_path = model_path.as_ref().to_path_buf();
        let name = format!("Whisper model {}", model_path.display());
        Self {
            handle: ModelHandle::new(name, move || {
                WhisperTranscriber::load(&model_path, params.clone())
            }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_loaded()
    }
}

impl Transcriber for LazyTranscriber {
    fn transcribe(&self, audio_path: &Path) -> Result<String, SttError> {
        self.handle.get()?.transcribe(audio_path)
    }
}

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

/// Returns a pre-configured transcript without loading any model.
#[cfg(test)]
pub struct MockTranscriber {
    response: Result<String, String>,
}

#[cfg(test)]
impl MockTranscriber {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
        }
    }
}

#[cfg(test)]
impl Transcriber for MockTranscriber {
    fn transcribe(&self, _audio_path: &Path) -> Result<String, SttError> {
        self.response
            .clone()
            .map_err(SttError::Transcription)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_ok_returns_configured_text() {
        let t = MockTranscriber::ok("Добрий день");
        assert_eq!(t.transcribe(Path::new("x.wav")).unwrap(), "Добрий день");
    }

    #[test]
    fn mock_err_returns_transcription_error() {
        let t = MockTranscriber::err("boom");
        assert!(matches!(
            t.transcribe(Path::new("x.wav")),
            Err(SttError::Transcription(_))
        ));
    }

    #[test]
    fn load_missing_model_returns_model_not_found() {
        let result = WhisperTranscriber::load("/nonexistent/model.bin", TranscribeParams::default());
        assert!(
            matches!(result, Err(SttError::ModelNotFound(_))),
            "expected ModelNotFound, got: {result:?}"
        );
    }

    #[test]
    fn lazy_transcriber_defers_and_retries_load() {
        let lazy = LazyTranscriber::new("/nonexistent/model.bin", TranscribeParams::default());
        assert!(!lazy.is_loaded());

        let err = lazy.transcribe(Path::new("ref.wav")).unwrap_err();
        assert!(matches!(err, SttError::ModelNotFound(_)));
        assert!(!lazy.is_loaded());
    }

    #[test]
    fn box_dyn_transcriber_compiles() {
        let t: Box<dyn Transcriber> = Box::new(MockTranscriber::ok("ok"));
        let _ = t.transcribe(Path::new("x.wav"));
    }

    #[test]
    fn audio_error_display_is_forwarded() {
        let e = SttError::from(AudioError::Empty("ref.wav".into()));
        assert!(e.to_string().contains("ref.wav"));
    }
}
