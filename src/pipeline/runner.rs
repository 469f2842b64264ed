//! Synthesis pipeline: the single entry point the front end calls.
//!
//! [`SynthesisPipeline`] owns the request builder, the inference adapter,
//! the reference transcriber and the [`RequestQueue`].
//!
//! # Pipeline flow
//!
//! ```text
//! synthesize(text, selection, params)
//!   └─▶ queue (synthesis lane)
//!         └─▶ RequestBuilder::build  (normalize + resolve reference)
//!               ├─ Err → error slot
//!               └─ Ok  → spawn_blocking(adapter.run)
//!                          ├─ Final → audio + normalized text
//!                          ├─ Error → HTML error message
//!                          └─ Empty → "No audio generated"
//!
//! transcribe_reference(path)
//!   └─▶ queue (transcription lane) → spawn_blocking(transcriber) → normalize
//! ```
//!
//! All blocking work (engine stream consumption, Whisper inference) is pushed
//! onto `tokio::task::spawn_blocking` so the async runtime never stalls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::inference::{InferenceAdapter, InferenceOutcome, SynthesisEngine};
use crate::reference::ReferenceCatalog;
use crate::request::{
    BuildError, DecodingParams, ReferenceSelection, RequestBuilder, SynthesisRequest,
};
use crate::stt::{LazyTranscriber, TranscribeParams, Transcriber};
use crate::text::{StressError, TextNormalizer};

use super::queue::{Lane, QueueError, RequestQueue};

/// Shown when the engine stream ends without producing audio.
pub const NO_AUDIO_MESSAGE: &str = "No audio generated";

/// Text synthesized by [`SynthesisPipeline::warm_up`].
pub const WARM_UP_TEXT: &str = "Перевірка.";

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Errors that can surface inside the pipeline.
///
/// All variants carry a human-readable description so the front end can
/// display them without knowing the internal cause.
#[derive(Debug)]
pub enum PipelineError {
    /// The request could not be assembled.
    Build(BuildError),
    /// The queue refused the request.
    Queue(QueueError),
    /// Internal / unexpected error (e.g. tokio join failure).
    Internal(String),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Build(e) => write!(f, "{e}"),
            PipelineError::Queue(e) => write!(f, "{e}"),
            PipelineError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

// ---------------------------------------------------------------------------
// PipelineResponse
// ---------------------------------------------------------------------------

/// Result slots of one synthesis call.
///
/// Either `audio` and `normalized_text` are set together, or only `error`.
#[derive(Clone, Default, PartialEq)]
pub struct PipelineResponse {
    pub audio: Option<Vec<u8>>,
    pub normalized_text: Option<String>,
    pub error: Option<String>,
}

impl PipelineResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.audio.is_some()
    }
}

impl std::fmt::Debug for PipelineResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineResponse")
            .field("audio_bytes", &self.audio.as_ref().map(Vec::len))
            .field("normalized_text", &self.normalized_text)
            .field("error", &self.error)
            .finish()
    }
}

impl From<InferenceOutcome> for PipelineResponse {
    fn from(outcome: InferenceOutcome) -> Self {
        match outcome {
            InferenceOutcome::Final {
                audio,
                normalized_text,
            } => Self {
                audio: Some(audio),
                normalized_text: Some(normalized_text),
                error: None,
            },
            InferenceOutcome::Error(message) => Self::error(format_error_html(&message)),
            InferenceOutcome::Empty => Self::error(NO_AUDIO_MESSAGE),
        }
    }
}

/// Render an engine error as a bold red block with the message HTML-escaped.
pub fn format_error_html(message: &str) -> String {
    format!(
        "<div style=\"color: red; font-weight: bold;\">{}</div>",
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// SynthesisPipeline
// ---------------------------------------------------------------------------

/// Drives the complete text → request → audio pipeline.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ukrainian_tts::config::AppConfig;
/// use ukrainian_tts::inference::HttpEngine;
/// use ukrainian_tts::pipeline::SynthesisPipeline;
/// use ukrainian_tts::request::ReferenceSelection;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let engine = Arc::new(HttpEngine::from_config(&config.engine));
/// let pipeline = SynthesisPipeline::from_config(&config, engine)?;
///
/// let response = pipeline
///     .synthesize("Привіт!", &ReferenceSelection::None, &config.decoding)
///     .await;
/// println!("{response:?}");
/// # Ok(())
/// # }
/// ```
pub struct SynthesisPipeline {
    builder: RequestBuilder,
    adapter: InferenceAdapter,
    transcriber: Arc<dyn Transcriber>,
    queue: RequestQueue,
}

impl SynthesisPipeline {
    pub fn new(
        builder: RequestBuilder,
        adapter: InferenceAdapter,
        transcriber: Arc<dyn Transcriber>,
        queue: RequestQueue,
    ) -> Self {
        Self {
            builder,
            adapter,
            transcriber,
            queue,
        }
    }

    /// Scan the reference directory and wire every stage from `config`.
    ///
    /// The Whisper model is not loaded here; it is loaded on the first
    /// [`transcribe_reference`](Self::transcribe_reference) call.
    ///
    /// # Errors
    ///
    /// [`StressError`] when a configured stress dictionary cannot be loaded.
    pub fn from_config(
        config: &AppConfig,
        engine: Arc<dyn SynthesisEngine>,
    ) -> Result<Self, StressError> {
        let catalog = ReferenceCatalog::scan(&config.references);
        log::info!(
            "pipeline: {} reference voice(s) in {}",
            catalog.len(),
            config.references.dir.display()
        );

        let normalizer = TextNormalizer::from_config(config)?;
        let transcriber = LazyTranscriber::new(
            config.stt_model_path(),
            TranscribeParams::from_config(&config.stt),
        );

        Ok(Self::new(
            RequestBuilder::new(Arc::new(catalog), Arc::new(normalizer)),
            InferenceAdapter::new(engine),
            Arc::new(transcriber),
            RequestQueue::from_config(&config.queue),
        ))
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        self.builder.catalog()
    }

    /// Voice names for the reference dropdown, in display order.
    pub fn reference_names(&self) -> Vec<String> {
        self.catalog().names().into_iter().map(String::from).collect()
    }

    /// Audio path and transcript of a catalog voice, for preview.
    pub fn reference_preview(&self, name: &str) -> Option<(PathBuf, String)> {
        self.catalog()
            .get(name)
            .map(|voice| (voice.audio_path().to_path_buf(), voice.transcript().to_string()))
    }

    /// Refuse further requests. Requests already running are not interrupted.
    pub fn shutdown(&self) {
        self.queue.close();
    }

    // -----------------------------------------------------------------------
    // Synthesis
    // -----------------------------------------------------------------------

    /// Run one synthesis request end to end.
    ///
    /// Never fails: build errors, queue saturation and engine errors all land
    /// in [`PipelineResponse::error`].
    pub async fn synthesize(
        &self,
        text: &str,
        selection: &ReferenceSelection,
        params: &DecodingParams,
    ) -> PipelineResponse {
        let result = self
            .queue
            .run(Lane::Synthesis, self.run_synthesis(text, selection, params))
            .await
            .map_err(PipelineError::Queue)
            .and_then(|inner| inner);

        match result {
            Ok(response) => response,
            Err(e) => {
                log::error!("pipeline error: {e}");
                PipelineResponse::error(e.to_string())
            }
        }
    }

    async fn run_synthesis(
        &self,
        text: &str,
        selection: &ReferenceSelection,
        params: &DecodingParams,
    ) -> Result<PipelineResponse, PipelineError> {
        let request = self
            .builder
            .build(text, selection, params)
            .await
            .map_err(PipelineError::Build)?;

        log::debug!(
            "pipeline: synthesizing {:?} (reference: {})",
            request.text,
            request.reference_text().unwrap_or("none")
        );

        let outcome = self.run_blocking(request).await?;
        Ok(outcome.into())
    }

    async fn run_blocking(&self, request: SynthesisRequest) -> Result<InferenceOutcome, PipelineError> {
        let adapter = self.adapter.clone();
        tokio::task::spawn_blocking(move || adapter.run(&request))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Reference transcription
    // -----------------------------------------------------------------------

    /// Transcribe an uploaded reference clip and normalize the result.
    ///
    /// Every failure is absorbed into an empty string so the front end can
    /// leave the transcript box blank for the user to fill in.
    pub async fn transcribe_reference(&self, audio_path: Option<&Path>) -> String {
        let Some(path) = audio_path else {
            return String::new();
        };

        let transcriber = Arc::clone(&self.transcriber);
        let path = path.to_path_buf();
        let transcribed = self
            .queue
            .run(Lane::Transcription, async move {
                let shown = path.display().to_string();
                tokio::task::spawn_blocking(move || transcriber.transcribe(&path))
                    .await
                    .map_err(|e| format!("transcription task for {shown} failed: {e}"))
                    .and_then(|r| r.map_err(|e| e.to_string()))
            })
            .await;

        let transcript = match transcribed {
            Ok(Ok(text)) => text,
            Ok(Err(message)) => {
                log::warn!("pipeline: reference transcription failed: {message}");
                return String::new();
            }
            Err(e) => {
                log::warn!("pipeline: reference transcription not queued: {e}");
                return String::new();
            }
        };

        if transcript.trim().is_empty() {
            return String::new();
        }

        self.builder.normalizer().normalize(&transcript).await
    }

    // -----------------------------------------------------------------------
    // Warm-up
    // -----------------------------------------------------------------------

    /// Push one short reference-less request through the engine so the first
    /// user request does not pay the start-up cost.
    pub async fn warm_up(&self) -> InferenceOutcome {
        let params = DecodingParams {
            max_new_tokens: 1024,
            chunk_length: 200,
            top_p: 0.7,
            repetition_penalty: 1.5,
            temperature: 0.7,
            seed: None,
        };
        let request = SynthesisRequest::new(WARM_UP_TEXT, None, params.clamped());

        let started = std::time::Instant::now();
        let outcome = match self.run_blocking(request).await {
            Ok(outcome) => outcome,
            Err(e) => InferenceOutcome::Error(e.to_string()),
        };

        match &outcome {
            InferenceOutcome::Final { audio, .. } => log::info!(
                "pipeline: warm-up done in {} ms ({} bytes)",
                started.elapsed().as_millis(),
                audio.len()
            ),
            other => log::warn!("pipeline: warm-up did not produce audio: {other:?}"),
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::config::ReferenceConfig;
    use crate::inference::{ChunkStream, InferenceChunk};
    use crate::stt::MockTranscriber;
    use crate::text::{NoStress, PassthroughVerbalizer};
    use tempfile::{tempdir, TempDir};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Engine that records every request and answers with a fixed script.
    struct RecordingEngine {
        script: Vec<InferenceChunk>,
        seen: Mutex<Vec<SynthesisRequest>>,
    }

    impl RecordingEngine {
        fn new(script: Vec<InferenceChunk>) -> Arc<Self> {
            Arc::new(Self {
                script,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn final_audio(bytes: &[u8]) -> Arc<Self> {
            Self::new(vec![
                InferenceChunk::Header,
                InferenceChunk::Final {
                    audio: bytes.to_vec(),
                },
            ])
        }

        fn requests(&self) -> Vec<SynthesisRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl SynthesisEngine for RecordingEngine {
        fn inference<'a>(&'a self, request: &'a SynthesisRequest) -> ChunkStream<'a> {
            self.seen.lock().unwrap().push(request.clone());
            Box::new(self.script.clone().into_iter())
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// alice.wav + alice.lab("Hello"), and bob.wav with no transcript.
    fn reference_dir() -> TempDir {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("alice.wav"), b"alice-audio").unwrap();
        std::fs::write(dir.path().join("alice.lab"), "Hello").unwrap();
        std::fs::write(dir.path().join("bob.wav"), b"bob-audio").unwrap();
        dir
    }

    fn make_pipeline(
        dir: &Path,
        engine: Arc<RecordingEngine>,
        transcriber: Arc<dyn Transcriber>,
    ) -> SynthesisPipeline {
        let catalog = ReferenceCatalog::scan(&ReferenceConfig {
            dir: dir.to_path_buf(),
            ..ReferenceConfig::default()
        });
        let normalizer = TextNormalizer::new(Arc::new(PassthroughVerbalizer), Arc::new(NoStress));

        SynthesisPipeline::new(
            RequestBuilder::new(Arc::new(catalog), Arc::new(normalizer)),
            InferenceAdapter::new(engine),
            transcriber,
            RequestQueue::new(1, 1, 40),
        )
    }

    fn catalog(name: &str) -> ReferenceSelection {
        ReferenceSelection::Catalog(name.to_string())
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn alice_bob_carol_end_to_end() {
        let dir = reference_dir();
        let engine = RecordingEngine::final_audio(b"RIFF-out");
        let pipeline = make_pipeline(dir.path(), Arc::clone(&engine), Arc::new(MockTranscriber::ok("")));

        // bob has no transcript, so only alice is listed.
        assert_eq!(pipeline.reference_names(), vec!["alice".to_string()]);
        assert!(pipeline.reference_preview("bob").is_none());
        assert!(pipeline.reference_preview("carol").is_none());

        let (path, transcript) = pipeline.reference_preview("alice").unwrap();
        assert_eq!(path, dir.path().join("alice.wav"));
        assert_eq!(transcript, "Hello");

        let params = DecodingParams::default();
        let alice = pipeline.synthesize("Текст", &catalog("alice"), &params).await;
        let carol = pipeline.synthesize("Текст", &catalog("carol"), &params).await;
        assert!(alice.is_success());
        assert!(carol.is_success());

        let requests = engine.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].reference_text(), Some("Hello"));
        assert_eq!(requests[0].reference_audio(), Some(&b"alice-audio"[..]));
        assert!(requests[1].reference.is_none(), "carol resolves to no reference");
    }

    #[tokio::test]
    async fn final_outcome_fills_audio_and_text_slots() {
        let dir = reference_dir();
        let engine = RecordingEngine::final_audio(b"wav-bytes");
        let pipeline = make_pipeline(dir.path(), engine, Arc::new(MockTranscriber::ok("")));

        let response = pipeline
            .synthesize("Добрий день", &ReferenceSelection::None, &DecodingParams::default())
            .await;

        assert_eq!(response.audio.as_deref(), Some(&b"wav-bytes"[..]));
        assert_eq!(response.normalized_text.as_deref(), Some("Добрий день"));
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn engine_error_is_rendered_as_escaped_html() {
        let dir = reference_dir();
        let engine = RecordingEngine::new(vec![InferenceChunk::Error {
            message: "CUDA <out of memory> & more".into(),
        }]);
        let pipeline = make_pipeline(dir.path(), engine, Arc::new(MockTranscriber::ok("")));

        let response = pipeline
            .synthesize("Текст", &ReferenceSelection::None, &DecodingParams::default())
            .await;

        assert!(response.audio.is_none());
        assert!(response.normalized_text.is_none());
        let error = response.error.unwrap();
        assert!(error.starts_with("<div style=\"color: red;"));
        assert!(error.contains("CUDA &lt;out of memory&gt; &amp; more"));
    }

    #[tokio::test]
    async fn exhausted_stream_reports_no_audio() {
        let dir = reference_dir();
        let engine = RecordingEngine::new(vec![
            InferenceChunk::Header,
            InferenceChunk::Segment { audio: vec![1, 2] },
        ]);
        let pipeline = make_pipeline(dir.path(), engine, Arc::new(MockTranscriber::ok("")));

        let response = pipeline
            .synthesize("Текст", &ReferenceSelection::None, &DecodingParams::default())
            .await;

        assert_eq!(response, PipelineResponse::error(NO_AUDIO_MESSAGE));
    }

    #[tokio::test]
    async fn unreadable_reference_lands_in_error_slot() {
        let dir = reference_dir();
        let engine = RecordingEngine::final_audio(b"x");
        let pipeline = make_pipeline(dir.path(), Arc::clone(&engine), Arc::new(MockTranscriber::ok("")));

        let selection = ReferenceSelection::CustomUpload {
            audio_path: Some(dir.path().join("missing.wav")),
            transcript: "Привіт".into(),
            catalog: None,
        };
        let response = pipeline
            .synthesize("Текст", &selection, &DecodingParams::default())
            .await;

        assert!(response.audio.is_none());
        assert!(response.error.unwrap().contains("missing.wav"));
        assert!(engine.requests().is_empty(), "engine must not be called");
    }

    #[tokio::test]
    async fn transcribe_reference_absorbs_failures() {
        let dir = reference_dir();
        let upload = dir.path().join("upload.wav");

        let failing = make_pipeline(
            dir.path(),
            RecordingEngine::final_audio(b"x"),
            Arc::new(MockTranscriber::err("model missing")),
        );
        assert_eq!(failing.transcribe_reference(Some(&upload)).await, "");
        assert_eq!(failing.transcribe_reference(None).await, "");

        let blank = make_pipeline(
            dir.path(),
            RecordingEngine::final_audio(b"x"),
            Arc::new(MockTranscriber::ok("   ")),
        );
        assert_eq!(blank.transcribe_reference(Some(&upload)).await, "");
    }

    #[tokio::test]
    async fn transcribe_reference_normalizes_transcript() {
        let dir = reference_dir();
        let pipeline = make_pipeline(
            dir.path(),
            RecordingEngine::final_audio(b"x"),
            Arc::new(MockTranscriber::ok("Слово\u{02BC}")),
        );

        let text = pipeline
            .transcribe_reference(Some(&dir.path().join("upload.wav")))
            .await;
        assert_eq!(text, "Слово");
    }

    #[tokio::test]
    async fn warm_up_sends_reference_less_request() {
        let dir = reference_dir();
        let engine = RecordingEngine::final_audio(b"warm");
        let pipeline = make_pipeline(dir.path(), Arc::clone(&engine), Arc::new(MockTranscriber::ok("")));

        let outcome = pipeline.warm_up().await;
        assert!(matches!(outcome, InferenceOutcome::Final { .. }));

        let requests = engine.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.text, WARM_UP_TEXT);
        assert!(request.reference.is_none());
        assert_eq!(request.max_new_tokens, 1024);
        assert_eq!(request.chunk_length, 200);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn requests_after_shutdown_report_closed_queue() {
        let dir = reference_dir();
        let engine = RecordingEngine::final_audio(b"x");
        let pipeline = make_pipeline(dir.path(), Arc::clone(&engine), Arc::new(MockTranscriber::ok("текст")));

        pipeline.shutdown();

        let response = pipeline
            .synthesize("Текст", &ReferenceSelection::None, &DecodingParams::default())
            .await;
        assert_eq!(response, PipelineResponse::error(QueueError::Closed.to_string()));
        assert!(engine.requests().is_empty());

        let upload = dir.path().join("upload.wav");
        assert_eq!(pipeline.transcribe_reference(Some(&upload)).await, "");
    }

    #[test]
    fn escape_html_covers_quotes() {
        assert_eq!(escape_html(r#"a"b'c"#), "a&quot;b&#x27;c");
    }
}
