//! Channel mixing and sample-rate conversion for Whisper input.
//!
//! Whisper wants **16 kHz mono `f32`**. Reference uploads arrive at whatever
//! rate and channel count the user recorded with.

/// Sample rate Whisper expects.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Average interleaved channels down to mono.
///
/// `channels == 0` yields an empty vector; a trailing partial frame is
/// dropped.
///
/// ```rust
/// use ukrainian_tts::audio::downmix;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = downmix(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Linear-interpolation resampler from `from_rate` to `to_rate`.
///
/// Output length is `ceil(len * to_rate / from_rate)`. Equal rates and empty
/// input return a copy.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).ceil() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 / ratio;
            let idx = (pos as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            match samples.get(idx + 1) {
                Some(next) => samples[idx] * (1.0 - frac) + next * frac,
                None => samples[idx],
            }
        })
        .collect()
}
