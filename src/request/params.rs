//! Decoding parameters and the synthesis request they end up in.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

pub const CHUNK_LENGTH_RANGE: RangeInclusive<i64> = 0..=300;
pub const MAX_NEW_TOKENS_RANGE: RangeInclusive<i64> = 0..=2048;
pub const REPETITION_PENALTY_RANGE: RangeInclusive<f32> = 1.0..=2.0;

/// Smallest value kept for the half-open `(0, 1]` parameters.
pub const MIN_OPEN_UNIT: f32 = 0.01;

// ---------------------------------------------------------------------------
// DecodingParams
// ---------------------------------------------------------------------------

/// Caller-supplied decoding knobs, possibly out of range.
///
/// `0` for `max_new_tokens` means "no limit" and `0` for `chunk_length`
/// disables iterative prompting; both are forwarded as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodingParams {
    pub max_new_tokens: i64,
    pub chunk_length: i64,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub temperature: f32,
    /// `None` or `Some(0)` means non-deterministic sampling.
    pub seed: Option<i64>,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 0,
            chunk_length: 300,
            top_p: 0.7,
            repetition_penalty: 1.5,
            temperature: 0.8,
            seed: None,
        }
    }
}

/// Decoding knobs after clamping; every field is inside its bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampedParams {
    pub max_new_tokens: u32,
    pub chunk_length: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub temperature: f32,
    pub seed: Option<i64>,
}

fn clamp_int(value: i64, range: &RangeInclusive<i64>) -> u32 {
    value.clamp(*range.start(), *range.end()) as u32
}

fn clamp_unit_open(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        return fallback;
    }
    value.clamp(MIN_OPEN_UNIT, 1.0)
}

impl DecodingParams {
    /// Clamp every field into its bound. Out-of-range values are pulled to
    /// the nearest edge, NaN falls back to the default.
    pub fn clamped(&self) -> ClampedParams {
        let defaults = Self::default();

        let repetition_penalty = if self.repetition_penalty.is_nan() {
            defaults.repetition_penalty
        } else {
            self.repetition_penalty.clamp(
                *REPETITION_PENALTY_RANGE.start(),
                *REPETITION_PENALTY_RANGE.end(),
            )
        };

        let clamped = ClampedParams {
            max_new_tokens: clamp_int(self.max_new_tokens, &MAX_NEW_TOKENS_RANGE),
            chunk_length: clamp_int(self.chunk_length, &CHUNK_LENGTH_RANGE),
            top_p: clamp_unit_open(self.top_p, defaults.top_p),
            repetition_penalty,
            temperature: clamp_unit_open(self.temperature, defaults.temperature),
            seed: self.seed.filter(|&s| s != 0),
        };

        if clamped.max_new_tokens as i64 != self.max_new_tokens
            || clamped.chunk_length as i64 != self.chunk_length
            || clamped.top_p != self.top_p
            || clamped.repetition_penalty != self.repetition_penalty
            || clamped.temperature != self.temperature
        {
            log::debug!("decoding params clamped: {self:?} -> {clamped:?}");
        }

        clamped
    }
}

// ---------------------------------------------------------------------------
// ReferenceAudio
// ---------------------------------------------------------------------------

/// Reference audio bytes with their transcript. The transcript is never blank.
#[derive(Clone, PartialEq)]
pub struct ReferenceAudio {
    audio: Vec<u8>,
    text: String,
}

impl ReferenceAudio {
    /// `None` when `text` is blank after trimming.
    pub fn new(audio: Vec<u8>, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            audio,
            text: text.to_string(),
        })
    }

    pub fn audio(&self) -> &[u8] {
        &self.audio
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Debug for ReferenceAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceAudio")
            .field("audio_bytes", &self.audio.len())
            .field("text", &self.text)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SynthesisRequest
// ---------------------------------------------------------------------------

/// One fully-resolved call into the TTS engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub reference: Option<ReferenceAudio>,
    pub max_new_tokens: u32,
    pub chunk_length: u32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub temperature: f32,
    pub seed: Option<i64>,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        reference: Option<ReferenceAudio>,
        params: ClampedParams,
    ) -> Self {
        Self {
            text: text.into(),
            reference,
            max_new_tokens: params.max_new_tokens,
            chunk_length: params.chunk_length,
            top_p: params.top_p,
            repetition_penalty: params.repetition_penalty,
            temperature: params.temperature,
            seed: params.seed,
        }
    }

    pub fn reference_audio(&self) -> Option<&[u8]> {
        self.reference.as_ref().map(ReferenceAudio::audio)
    }

    pub fn reference_text(&self) -> Option<&str> {
        self.reference.as_ref().map(ReferenceAudio::text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
