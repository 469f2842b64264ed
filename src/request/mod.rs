//! Synthesis request construction.
//!
//! * [`DecodingParams`]: caller knobs; [`DecodingParams::clamped`] pulls
//!   them into range.
//! * [`ReferenceSelection`]: catalog voice, ad-hoc upload, or nothing.
//! * [`RequestBuilder`]: normalizes text, resolves the reference, reads its
//!   audio and returns a [`SynthesisRequest`].

pub mod builder;
pub mod params;

pub use builder::{BuildError, ReferenceSelection, RequestBuilder};
pub use params::{ClampedParams, DecodingParams, ReferenceAudio, SynthesisRequest};
