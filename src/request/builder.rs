//! Turns raw UI input into a [`SynthesisRequest`].
//!
//! Reference resolution, highest priority first:
//!
//! 1. `CustomUpload` with an audio path **and** a non-blank transcript.
//! 2. `Catalog(name)` (or the name carried alongside an incomplete upload)
//!    that resolves in the catalog.
//! 3. No reference: the engine synthesizes with its default voice.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::reference::ReferenceCatalog;
use crate::request::params::{DecodingParams, ReferenceAudio, SynthesisRequest};
use crate::text::TextNormalizer;

// ---------------------------------------------------------------------------
// BuildError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BuildError {
    /// The resolved reference audio file could not be read.
    #[error("cannot read reference audio {path}: {source}")]
    ReferenceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// ReferenceSelection
// ---------------------------------------------------------------------------

/// What the user picked as the voice to clone.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReferenceSelection {
    /// A voice from the scanned catalog.
    Catalog(String),
    /// An ad-hoc upload. Either half may be missing while the user is still
    /// filling the form; `catalog` is the dropdown value at the same moment.
    CustomUpload {
        audio_path: Option<PathBuf>,
        transcript: String,
        catalog: Option<String>,
    },
    #[default]
    None,
}

/// Where the reference for a request came from.
enum Resolved<'a> {
    Custom { path: &'a Path, transcript: &'a str },
    Catalog { path: &'a Path, transcript: &'a str, name: &'a str },
    None,
}

// ---------------------------------------------------------------------------
// RequestBuilder
// ---------------------------------------------------------------------------

pub struct RequestBuilder {
    catalog: Arc<ReferenceCatalog>,
    normalizer: Arc<TextNormalizer>,
}

impl RequestBuilder {
    pub fn new(catalog: Arc<ReferenceCatalog>, normalizer: Arc<TextNormalizer>) -> Self {
        Self {
            catalog,
            normalizer,
        }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Normalize `raw_text`, resolve the reference and read its audio.
    ///
    /// # Errors
    ///
    /// [`BuildError::ReferenceIo`] when the resolved reference audio cannot
    /// be read. An unresolvable catalog name is not an error.
    pub async fn build(
        &self,
        raw_text: &str,
        selection: &ReferenceSelection,
        params: &DecodingParams,
    ) -> Result<SynthesisRequest, BuildError> {
        let text = self.normalizer.normalize(raw_text).await;
        let reference = self.load_reference(selection).await?;
        Ok(SynthesisRequest::new(text, reference, params.clamped()))
    }

    fn resolve<'a>(&'a self, selection: &'a ReferenceSelection) -> Resolved<'a> {
        let catalog_name = match selection {
            ReferenceSelection::CustomUpload {
                audio_path: Some(path),
                transcript,
                ..
            } if !transcript.trim().is_empty() => {
                return Resolved::Custom {
                    path,
                    transcript: transcript.trim(),
                };
            }
            ReferenceSelection::CustomUpload { catalog, .. } => catalog.as_deref(),
            ReferenceSelection::Catalog(name) => Some(name.as_str()),
            ReferenceSelection::None => None,
        };

        let Some(name) = catalog_name else {
            return Resolved::None;
        };

        match self.catalog.get(name) {
            Some(voice) => Resolved::Catalog {
                path: voice.audio_path(),
                transcript: voice.transcript(),
                name: voice.name(),
            },
            None => {
                log::debug!("reference {name:?} is not in the catalog; synthesizing without one");
                Resolved::None
            }
        }
    }

    async fn load_reference(
        &self,
        selection: &ReferenceSelection,
    ) -> Result<Option<ReferenceAudio>, BuildError> {
        let (path, transcript) = match self.resolve(selection) {
            Resolved::Custom { path, transcript } => {
                log::info!("using uploaded reference {}", path.display());
                (path, transcript)
            }
            Resolved::Catalog {
                path,
                transcript,
                name,
            } => {
                if transcript.trim().is_empty() {
                    log::warn!("reference {name:?} has an empty transcript; ignoring it");
                    return Ok(None);
                }
                log::info!("using catalog reference {name:?}");
                (path, transcript)
            }
            Resolved::None => return Ok(None),
        };

        let audio = tokio::fs::read(path)
            .await
            .map_err(|source| BuildError::ReferenceIo {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(ReferenceAudio::new(audio, transcript))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
