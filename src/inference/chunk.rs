//! Engine-side types: the streamed chunk and the engine trait.

use crate::request::SynthesisRequest;

/// One item of the engine's result stream.
///
/// Only [`Final`](Self::Final) and [`Error`](Self::Error) are terminal; the
/// rest are progress the adapter skips over.
#[derive(Clone, PartialEq)]
pub enum InferenceChunk {
    /// Stream preamble (e.g. a WAV header for streamed output).
    Header,
    /// Partial audio for streamed output.
    Segment { audio: Vec<u8> },
    /// Complete audio for the request.
    Final { audio: Vec<u8> },
    /// The engine gave up on the request.
    Error { message: String },
}

impl InferenceChunk {
    /// Wire tag of the chunk.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Segment { .. } => "segment",
            Self::Final { .. } => "final",
            Self::Error { .. } => "error",
        }
    }
}

impl std::fmt::Debug for InferenceChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header => f.write_str("Header"),
            Self::Segment { audio } => write!(f, "Segment({} bytes)", audio.len()),
            Self::Final { audio } => write!(f, "Final({} bytes)", audio.len()),
            Self::Error { message } => write!(f, "Error({message:?})"),
        }
    }
}

/// Lazily evaluated, finite chunk stream.
pub type ChunkStream<'a> = Box<dyn Iterator<Item = InferenceChunk> + Send + 'a>;

/// Object-safe, thread-safe interface to a TTS inference engine.
///
/// Implementations must not do any work before the stream is first polled,
/// and must stop producing side effects once the consumer drops the stream.
pub trait SynthesisEngine: Send + Sync {
    fn inference<'a>(&'a self, request: &'a SynthesisRequest) -> ChunkStream<'a>;
}

// Compile-time assertion: Box<dyn SynthesisEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SynthesisEngine>) {}
};
