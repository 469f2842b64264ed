//! Reduces an engine's chunk stream to a single [`InferenceOutcome`].
//!
//! ```text
//! [header] [segment] [segment] [final] [..never polled..]
//!                                 └─▶ Final
//! [header] [error]  [..never polled..]
//!             └─▶ Error
//! [header] [segment]  <end>
//!                       └─▶ Empty
//! ```

use std::sync::Arc;

use crate::inference::chunk::{InferenceChunk, SynthesisEngine};
use crate::request::SynthesisRequest;

/// Exactly one per request.
#[derive(Clone, PartialEq)]
pub enum InferenceOutcome {
    /// Audio plus the (normalized) text it was synthesized from.
    Final {
        audio: Vec<u8>,
        normalized_text: String,
    },
    /// Engine-reported failure, carried as data.
    Error(String),
    /// The stream ended without a terminal chunk.
    Empty,
}

impl std::fmt::Debug for InferenceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Final {
                audio,
                normalized_text,
            } => f
                .debug_struct("Final")
                .field("audio_bytes", &audio.len())
                .field("normalized_text", normalized_text)
                .finish(),
            Self::Error(message) => f.debug_tuple("Error").field(message).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Drives a [`SynthesisEngine`] and applies the first-terminal-chunk-wins
/// policy.
#[derive(Clone)]
pub struct InferenceAdapter {
    engine: Arc<dyn SynthesisEngine>,
}

impl InferenceAdapter {
    pub fn new(engine: Arc<dyn SynthesisEngine>) -> Self {
        Self { engine }
    }

    /// Consume the stream until the first `final` or `error` chunk.
    ///
    /// Blocking: call from `spawn_blocking` inside async code.
    pub fn run(&self, request: &SynthesisRequest) -> InferenceOutcome {
        for chunk in self.engine.inference(request) {
            match chunk {
                InferenceChunk::Final { audio } => {
                    log::debug!("inference: final chunk ({} bytes)", audio.len());
                    return InferenceOutcome::Final {
                        audio,
                        normalized_text: request.text.clone(),
                    };
                }
                InferenceChunk::Error { message } => {
                    log::warn!("inference: engine reported error: {message}");
                    return InferenceOutcome::Error(message);
                }
                other => log::trace!("inference: skipping {} chunk", other.code()),
            }
        }

        log::warn!("inference: stream ended without a final chunk");
        InferenceOutcome::Empty
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::chunk::ChunkStream;
    use crate::request::DecodingParams;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed script and counts how many chunks were produced.
    struct ScriptedEngine {
        script: Vec<InferenceChunk>,
        produced: Arc<AtomicUsize>,
    }

    impl ScriptedEngine {
        fn new(script: Vec<InferenceChunk>) -> (Self, Arc<AtomicUsize>) {
            let produced = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    script,
                    produced: Arc::clone(&produced),
                },
                produced,
            )
        }
    }

    impl SynthesisEngine for ScriptedEngine {
        fn inference<'a>(&'a self, _request: &'a SynthesisRequest) -> ChunkStream<'a> {
            let produced = Arc::clone(&self.produced);
            Box::new(self.script.iter().cloned().inspect(move |_| {
                produced.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, None, DecodingParams::default().clamped())
    }

    fn run(script: Vec<InferenceChunk>) -> (InferenceOutcome, usize) {
        let (engine, produced) = ScriptedEngine::new(script);
        let adapter = InferenceAdapter::new(Arc::new(engine));
        let outcome = adapter.run(&request("нормалізований текст"));
        (outcome, produced.load(Ordering::SeqCst))
    }

    #[test]
    fn final_after_other_wins_and_stops_the_stream() {
        let (outcome, produced) = run(vec![
            InferenceChunk::Header,
            InferenceChunk::Final { audio: vec![1, 2, 3] },
            InferenceChunk::Segment { audio: vec![9] },
        ]);

        assert_eq!(
            outcome,
            InferenceOutcome::Final {
                audio: vec![1, 2, 3],
                normalized_text: "нормалізований текст".into(),
            }
        );
        assert_eq!(produced, 2, "trailing chunk must not be evaluated");
    }

    #[test]
    fn error_chunk_is_returned_as_data() {
        let (outcome, _) = run(vec![InferenceChunk::Error {
            message: "boom".into(),
        }]);
        assert_eq!(outcome, InferenceOutcome::Error("boom".into()));
    }

    #[test]
    fn error_before_final_wins() {
        let (outcome, produced) = run(vec![
            InferenceChunk::Segment { audio: vec![1] },
            InferenceChunk::Error {
                message: "out of memory".into(),
            },
            InferenceChunk::Final { audio: vec![2] },
        ]);
        assert_eq!(outcome, InferenceOutcome::Error("out of memory".into()));
        assert_eq!(produced, 2);
    }

    #[test]
    fn empty_stream_is_empty() {
        let (outcome, produced) = run(vec![]);
        assert_eq!(outcome, InferenceOutcome::Empty);
        assert_eq!(produced, 0);
    }

    #[test]
    fn only_progress_chunks_is_empty() {
        let (outcome, produced) = run(vec![
            InferenceChunk::Header,
            InferenceChunk::Segment { audio: vec![1] },
            InferenceChunk::Segment { audio: vec![2] },
        ]);
        assert_eq!(outcome, InferenceOutcome::Empty);
        assert_eq!(produced, 3);
    }

    #[test]
    fn segments_are_not_concatenated_into_final() {
        let (outcome, _) = run(vec![
            InferenceChunk::Segment { audio: vec![1] },
            InferenceChunk::Final { audio: vec![7, 7] },
        ]);
        assert!(matches!(outcome, InferenceOutcome::Final { ref audio, .. } if audio == &[7, 7]));
    }
}
