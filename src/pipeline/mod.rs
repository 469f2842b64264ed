//! Presentation boundary for the Ukrainian TTS front-end.
//!
//! # Architecture
//!
//! ```text
//! front end (CLI / web UI)
//!        │
//!        ▼
//! SynthesisPipeline
//!        │
//!        ├─ synthesize()            ─▶ RequestQueue[synthesis]
//!        │                              └─ RequestBuilder → InferenceAdapter
//!        ├─ transcribe_reference()  ─▶ RequestQueue[transcription]
//!        │                              └─ Transcriber → TextNormalizer
//!        ├─ reference_names() / reference_preview()
//!        └─ warm_up()
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ukrainian_tts::config::AppConfig;
//! use ukrainian_tts::inference::HttpEngine;
//! use ukrainian_tts::pipeline::SynthesisPipeline;
//! use ukrainian_tts::request::ReferenceSelection;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = AppConfig::load()?;
//! let engine = Arc::new(HttpEngine::from_config(&config.engine));
//! let pipeline = SynthesisPipeline::from_config(&config, engine)?;
//!
//! let selection = ReferenceSelection::Catalog("alice".into());
//! let response = pipeline.synthesize("Добрий день!", &selection, &config.decoding).await;
//! if let Some(error) = response.error {
//!     eprintln!("{error}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod queue;
pub mod runner;

pub use queue::{Lane, QueueError, RequestQueue};
pub use runner::{
    format_error_html, PipelineError, PipelineResponse, SynthesisPipeline, NO_AUDIO_MESSAGE,
    WARM_UP_TEXT,
};
