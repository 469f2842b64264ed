//! `Verbalizer` trait and the HTTP-backed `ApiVerbalizer`.
//!
//! Verbalization expands numerals, dates, units and abbreviations into their
//! spoken form ("15.03.2024" → "п'ятнадцятого березня дві тисячі двадцять
//! четвертого року"). The model itself is remote; `ApiVerbalizer` posts to
//! a hosted text2text endpoint whose location comes from [`VerbalizerConfig`].

use async_trait::async_trait;
use thiserror::Error;

use crate::config::VerbalizerConfig;

/// Prompt prefix the verbalization model was fine-tuned with.
const TASK_PREFIX: &str = "<verbalization>:";

/// Beam width used for generation.
const NUM_BEAMS: u32 = 5;

// ---------------------------------------------------------------------------
// VerbalizeError
// ---------------------------------------------------------------------------

/// Errors that can occur during verbalization.
#[derive(Debug, Error)]
pub enum VerbalizeError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("verbalization request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("verbalization endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse verbalization response: {0}")]
    Parse(String),

    /// The model returned no usable text.
    #[error("verbalization model returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for VerbalizeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VerbalizeError::Timeout
        } else {
            VerbalizeError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Verbalizer trait
// ---------------------------------------------------------------------------

/// Text → spoken-form text. May fail; callers decide the fallback.
///
/// # Arguments
/// * `text`       – Raw user text.
/// * `max_tokens` – Generation budget for the model.
#[async_trait]
pub trait Verbalizer: Send + Sync {
    async fn verbalize(&self, text: &str, max_tokens: usize) -> Result<String, VerbalizeError>;
}

// ---------------------------------------------------------------------------
// PassthroughVerbalizer
// ---------------------------------------------------------------------------

/// Returns its input unchanged. Used when verbalization is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughVerbalizer;

#[async_trait]
impl Verbalizer for PassthroughVerbalizer {
    async fn verbalize(&self, text: &str, _max_tokens: usize) -> Result<String, VerbalizeError> {
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// ApiVerbalizer
// ---------------------------------------------------------------------------

/// Calls `POST {base_url}/models/{model}` on a hosted text2text endpoint.
///
/// Request body:
///
/// ```json
/// { "inputs": "<verbalization>:…",
///   "parameters": { "max_length": 1024, "num_beams": 5, "early_stopping": true } }
/// ```
///
/// Both `[{"generated_text": …}]` and `{"generated_text": …}` responses are
/// accepted.
pub struct ApiVerbalizer {
    client: reqwest::Client,
    config: VerbalizerConfig,
}

impl ApiVerbalizer {
    /// Build an `ApiVerbalizer` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is the fallback if the builder
    /// fails.
    pub fn from_config(config: &VerbalizerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Pull the generated text out of either response shape.
fn extract_generated_text(json: &serde_json::Value) -> Option<&str> {
    json.get(0)
        .and_then(|first| first.get("generated_text"))
        .or_else(|| json.get("generated_text"))
        .and_then(|v| v.as_str())
}

#[async_trait]
impl Verbalizer for ApiVerbalizer {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn verbalize(&self, text: &str, max_tokens: usize) -> Result<String, VerbalizeError> {
        let body = serde_json::json!({
            "inputs": format!("{TASK_PREFIX}{text}"),
            "parameters": {
                "max_length":     max_tokens,
                "num_beams":      NUM_BEAMS,
                "early_stopping": true
            }
        });

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerbalizeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VerbalizeError::Parse(e.to_string()))?;

        let verbalized = extract_generated_text(&json)
            .ok_or(VerbalizeError::EmptyResponse)?
            .trim()
            .to_string();

        if verbalized.is_empty() {
            return Err(VerbalizeError::EmptyResponse);
        }

        Ok(verbalized)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
