//! [`SynthesisEngine`] backed by a TTS inference server.
//!
//! `POST {base_url}/v1/tts` with a JSON body; reference audio travels as
//! base64. A 2xx answer is the complete WAV file and becomes a single
//! `Final` chunk, anything else becomes a single `Error` chunk. The HTTP call
//! happens on the first poll of the stream, never earlier.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::inference::chunk::{ChunkStream, InferenceChunk, SynthesisEngine};
use crate::request::SynthesisRequest;

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireReference<'a> {
    audio: String,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    text: &'a str,
    references: Vec<WireReference<'a>>,
    reference_id: Option<&'a str>,
    normalize: bool,
    format: &'static str,
    streaming: bool,
    max_new_tokens: u32,
    chunk_length: u32,
    top_p: f32,
    repetition_penalty: f32,
    temperature: f32,
    seed: Option<i64>,
}

impl<'a> WireRequest<'a> {
    fn from_request(request: &'a SynthesisRequest) -> Self {
        let references = request
            .reference
            .as_ref()
            .map(|r| WireReference {
                audio: BASE64.encode(r.audio()),
                text: r.text(),
            })
            .into_iter()
            .collect();

        Self {
            text: &request.text,
            references,
            reference_id: None,
            // Text arrives already verbalized and stress-marked.
            normalize: false,
            format: "wav",
            streaming: false,
            max_new_tokens: request.max_new_tokens,
            chunk_length: request.chunk_length,
            top_p: request.top_p,
            repetition_penalty: request.repetition_penalty,
            temperature: request.temperature,
            seed: request.seed,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpEngine
// ---------------------------------------------------------------------------

/// Blocking HTTP client for the TTS server.
///
/// Construct it outside of any async context and call
/// [`InferenceAdapter::run`](crate::inference::InferenceAdapter::run) on it
/// from `spawn_blocking`.
pub struct HttpEngine {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpEngine {
    pub fn from_config(config: &EngineConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            endpoint: format!("{}/v1/tts", config.base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call(&self, request: &SynthesisRequest) -> InferenceChunk {
        let body = WireRequest::from_request(request);
        log::debug!(
            "POST {} (text len={}, reference={})",
            self.endpoint,
            request.text.len(),
            request.reference.is_some()
        );

        let response = match self.client.post(&self.endpoint).json(&body).send() {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return InferenceChunk::Error {
                    message: "TTS server timed out".into(),
                }
            }
            Err(e) => {
                return InferenceChunk::Error {
                    message: format!("TTS server unreachable: {e}"),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return InferenceChunk::Error {
                message: format!("TTS server returned {status}: {}", detail.trim()),
            };
        }

        match response.bytes() {
            Ok(bytes) => InferenceChunk::Final {
                audio: bytes.to_vec(),
            },
            Err(e) => InferenceChunk::Error {
                message: format!("failed to read TTS response: {e}"),
            },
        }
    }
}

impl SynthesisEngine for HttpEngine {
    fn inference<'a>(&'a self, request: &'a SynthesisRequest) -> ChunkStream<'a> {
        Box::new(std::iter::once_with(move || self.call(request)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
