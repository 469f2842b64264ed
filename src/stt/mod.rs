//! Reference transcription.
//!
//! Users uploading their own reference voice can have the transcript filled
//! in automatically:
//!
//! ```text
//! upload.wav ──read_wav_16k_mono──▶ WhisperTranscriber ──▶ transcript
//!                                        ▲
//!                      LazyTranscriber ──┘ (ModelHandle, loaded on first use)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ukrainian_tts::stt::{LazyTranscriber, TranscribeParams, Transcriber};
//!
//! let transcriber = LazyTranscriber::new("models/ggml-large-v3-turbo.bin", TranscribeParams::default());
//! let text = transcriber.transcribe(Path::new("upload.wav")).unwrap_or_default();
//! println!("{text}");
//! ```

pub mod engine;
pub mod transcribe;

pub use engine::{LazyTranscriber, SttError, Transcriber, WhisperTranscriber};
pub use transcribe::TranscribeParams;

#[cfg(test)]
pub use engine::MockTranscriber;
