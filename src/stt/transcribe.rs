//! Transcription parameters.
//!
//! [`TranscribeParams`] carries everything that controls one Whisper run on
//! a reference upload.

use crate::config::SttConfig;

/// Parameters for transcribing a reference recording.
///
/// Defaults target short Ukrainian voice samples:
///
/// ```
/// use ukrainian_tts::stt::TranscribeParams;
///
/// let params = TranscribeParams::default();
/// assert_eq!(params.language, "uk");
/// assert_eq!(params.beam_size, 5);
/// assert!(!params.condition_on_previous_text);
/// ```
#[derive(Debug, Clone)]
pub struct TranscribeParams {
    /// ISO-639-1 code, or `"auto"` for Whisper's language detection.
    pub language: String,

    /// Beam width.
    pub beam_size: i32,

    /// Prompt fed to the decoder before the first window.
    pub initial_prompt: Option<String>,

    /// Let each window see the previous window's text. Off to stop one
    /// hallucinated window from contaminating the rest.
    pub condition_on_previous_text: bool,

    /// Emit per-token timestamps.
    pub token_timestamps: bool,

    /// CPU threads handed to Whisper. Defaults to [`optimal_threads()`].
    pub n_threads: i32,
}

impl Default for TranscribeParams {
    fn default() -> Self {
        Self::from_config(&SttConfig::default())
    }
}

impl TranscribeParams {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            language: config.language.clone(),
            beam_size: config.beam_size.max(1),
            initial_prompt: config.initial_prompt.clone(),
            condition_on_previous_text: false,
            token_timestamps: true,
            n_threads: optimal_threads(),
        }
    }
}

/// Number of CPU threads to use for inference, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}
