//! Directory scanner for reference voices.
//!
//! A reference voice is a pair of sibling files sharing a stem:
//!
//! ```text
//! references/
//!   alice.wav   ← audio sample
//!   alice.lab   ← UTF-8 transcript of the sample
//!   bob.wav     ← skipped (no bob.lab), logged as a warning
//! ```
//!
//! [`scan`] never fails: a missing directory or a broken pair only shrinks
//! the catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ReferenceConfig;

// ---------------------------------------------------------------------------
// ReferenceVoice
// ---------------------------------------------------------------------------

/// One audio sample + transcript pair used to condition voice cloning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceVoice {
    name: String,
    audio_path: PathBuf,
    transcript: String,
}

impl ReferenceVoice {
    pub fn new(
        name: impl Into<String>,
        audio_path: impl Into<PathBuf>,
        transcript: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            audio_path: audio_path.into(),
            transcript: transcript.into(),
        }
    }

    /// File stem of the audio file.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Transcript with surrounding whitespace removed.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

/// Scan `dir` for `<stem>.<audio_ext>` files that have a `<stem>.<transcript_ext>`
/// sibling.
///
/// The result is sorted by name (codepoint order) regardless of the order the
/// filesystem returns entries in.
pub fn scan(dir: &Path, audio_ext: &str, transcript_ext: &str) -> Vec<ReferenceVoice> {
    log::info!("scanning references directory: {}", dir.display());

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if dir.exists() {
                log::warn!("references directory {} is not readable: {e}", dir.display());
            } else {
                log::warn!("references directory {} does not exist", dir.display());
            }
            return Vec::new();
        }
    };

    let audio_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_extension(path, audio_ext))
        .collect();

    log::info!("found {} .{audio_ext} files", audio_files.len());

    let mut voices = Vec::with_capacity(audio_files.len());

    for audio_path in audio_files {
        let Some(name) = audio_path.file_stem().and_then(|s| s.to_str()) else {
            log::warn!("skipping {}: file name is not valid UTF-8", audio_path.display());
            continue;
        };
        let name = name.to_string();
        let transcript_path = audio_path.with_extension(transcript_ext);

        if !transcript_path.is_file() {
            log::warn!(
                "skipping {}: no .{transcript_ext} transcript found",
                audio_path.display()
            );
            continue;
        }

        match std::fs::read_to_string(&transcript_path) {
            Ok(text) => {
                log::debug!("added reference: {name}");
                voices.push(ReferenceVoice {
                    name,
                    audio_path,
                    transcript: text.trim().to_string(),
                });
            }
            Err(e) => {
                log::warn!(
                    "skipping {}: cannot read {}: {e}",
                    audio_path.display(),
                    transcript_path.display()
                );
            }
        }
    }

    // Stems are unique within one directory; equal names can only come from
    // extensions differing in case (`a.WAV` and `a.wav`). The path breaks the
    // tie so the same file wins regardless of `read_dir` order.
    sort_and_dedup(&mut voices);

    log::info!("total references found: {}", voices.len());
    voices
}

/// Sort by name, then audio path, and keep the first voice of each name.
fn sort_and_dedup(voices: &mut Vec<ReferenceVoice>) {
    voices.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.audio_path.cmp(&b.audio_path))
    });
    voices.dedup_by(|b, a| a.name == b.name);
}

/// Build a name → voice map. `None` or an empty slice yields an empty map.
pub fn to_lookup(voices: Option<&[ReferenceVoice]>) -> HashMap<String, ReferenceVoice> {
    let Some(voices) = voices else {
        log::warn!("reference list is missing; lookup is empty");
        return HashMap::new();
    };
    voices
        .iter()
        .map(|voice| (voice.name.clone(), voice.clone()))
        .collect()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

// ---------------------------------------------------------------------------
// ReferenceCatalog
// ---------------------------------------------------------------------------

/// Ordered list of reference voices plus an O(1) name index.
///
/// Read-only after construction; rebuild with a fresh [`ReferenceCatalog::scan`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    voices: Vec<ReferenceVoice>,
    by_name: HashMap<String, ReferenceVoice>,
}

impl ReferenceCatalog {
    /// Scan the directory described by `config`.
    pub fn scan(config: &ReferenceConfig) -> Self {
        Self::from_voices(scan(
            &config.dir,
            &config.audio_extension,
            &config.transcript_extension,
        ))
    }

    /// Build a catalog from already-collected voices, restoring sort order.
    pub fn from_voices(mut voices: Vec<ReferenceVoice>) -> Self {
        sort_and_dedup(&mut voices);
        let by_name = to_lookup(Some(&voices));
        Self { voices, by_name }
    }

    pub fn get(&self, name: &str) -> Option<&ReferenceVoice> {
        self.by_name.get(name)
    }

    /// Voice names in display order.
    pub fn names(&self) -> Vec<&str> {
        self.voices.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn voices(&self) -> &[ReferenceVoice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
