//! TTS engine integration.
//!
//! ```text
//! SynthesisRequest ──▶ SynthesisEngine::inference ──▶ lazy ChunkStream
//!                                                       │
//!                              InferenceAdapter::run ◀──┘
//!                                       │
//!                                       ▼
//!                      InferenceOutcome { Final | Error | Empty }
//! ```
//!
//! [`HttpEngine`] is the production engine; tests script their own.

pub mod adapter;
pub mod chunk;
pub mod http;

pub use adapter::{InferenceAdapter, InferenceOutcome};
pub use chunk::{ChunkStream, InferenceChunk, SynthesisEngine};
pub use http::HttpEngine;
