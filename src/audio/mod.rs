//! Audio decoding for reference transcription.
//!
//! ```text
//! reference.wav ──hound──▶ interleaved f32 ──downmix──▶ mono ──resample──▶ 16 kHz
//! ```

pub mod resample;
pub mod wav;

pub use resample::{downmix, resample, WHISPER_SAMPLE_RATE};
pub use wav::{read_wav_16k_mono, AudioError};
