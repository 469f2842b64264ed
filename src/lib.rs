//! Ukrainian TTS front-end: reference voice catalog, text normalization and
//! request construction in front of an external voice-cloning TTS engine.

pub mod audio;
pub mod config;
pub mod handle;
pub mod inference;
pub mod pipeline;
pub mod reference;
pub mod request;
pub mod stt;
pub mod text;
