//! WAV decoding into Whisper-ready samples.

use std::path::Path;

use hound::{SampleFormat, WavReader};
use thiserror::Error;

use crate::audio::resample::{downmix, resample, WHISPER_SAMPLE_RATE};

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("unsupported WAV format in {path}: {bits}-bit {format:?}")]
    UnsupportedFormat {
        path: String,
        bits: u16,
        format: SampleFormat,
    },

    #[error("{0} contains no audio")]
    Empty(String),
}

/// Read a WAV file as 16 kHz mono `f32` in `[-1, 1]`.
pub fn read_wav_16k_mono(path: &Path) -> Result<Vec<f32>, AudioError> {
    let display = path.display().to_string();
    let decode_err = |source| AudioError::Decode {
        path: display.clone(),
        source,
    };

    let mut reader = WavReader::open(path).map_err(decode_err)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(decode_err)?,
        (SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1_i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(decode_err)?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat {
                path: display,
                bits,
                format,
            })
        }
    };

    let mono = downmix(&interleaved, spec.channels);
    if mono.is_empty() {
        return Err(AudioError::Empty(display));
    }

    log::debug!(
        "decoded {display}: {} Hz, {} ch, {} frames",
        spec.sample_rate,
        spec.channels,
        mono.len()
    );

    Ok(resample(&mono, spec.sample_rate, WHISPER_SAMPLE_RATE))
}
