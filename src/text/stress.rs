//! Stress annotation.
//!
//! [`StressMarker`] never fails: a word it does not know is left untouched.
//!
//! [`DictionaryStressMarker`] reads a JSON object mapping a lower-case word
//! to the char index of its stressed vowel:
//!
//! ```json
//! { "привіт": 4, "мова": 1, "україна": 4 }
//! ```
//!
//! and inserts the stress symbol right after that vowel, preserving the
//! original letter case: `Привіт` → `Привіˈт`.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

/// Ukrainian vowels, both cases.
const VOWELS: &str = "аеєиіїоуюяАЕЄИІЇОУЮЯ";

// ---------------------------------------------------------------------------
// StressError
// ---------------------------------------------------------------------------

/// Failure to load a stress dictionary. Marking itself cannot fail.
#[derive(Debug, Error)]
pub enum StressError {
    #[error("cannot read stress dictionary {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed stress dictionary {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// StressMarker trait
// ---------------------------------------------------------------------------

pub trait StressMarker: Send + Sync {
    /// Return `text` with stress marks inserted.
    fn stressify(&self, text: &str) -> String;
}

/// Leaves text unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStress;

impl StressMarker for NoStress {
    fn stressify(&self, text: &str) -> String {
        text.to_string()
    }
}

// ---------------------------------------------------------------------------
// DictionaryStressMarker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DictionaryStressMarker {
    entries: HashMap<String, usize>,
    symbol: String,
}

impl DictionaryStressMarker {
    pub fn new(entries: HashMap<String, usize>, symbol: impl Into<String>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(word, idx)| (word.to_lowercase(), idx))
            .collect();
        Self {
            entries,
            symbol: symbol.into(),
        }
    }

    /// Load a JSON dictionary from `path`.
    pub fn load_from(path: &Path, symbol: impl Into<String>) -> Result<Self, StressError> {
        let data = std::fs::read_to_string(path).map_err(|source| StressError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let entries: HashMap<String, usize> =
            serde_json::from_str(&data).map_err(|source| StressError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        log::info!(
            "loaded stress dictionary {} ({} words)",
            path.display(),
            entries.len()
        );
        Ok(Self::new(entries, symbol))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark one word, or return it unchanged.
    fn mark_word(&self, word: &str, out: &mut String) {
        let chars: Vec<char> = word.chars().collect();
        let vowel_count = chars.iter().filter(|c| VOWELS.contains(**c)).count();

        let stressed = if vowel_count > 1 {
            self.entries
                .get(&word.to_lowercase())
                .copied()
                .filter(|&idx| chars.get(idx).is_some_and(|c| VOWELS.contains(*c)))
        } else {
            None
        };

        match stressed {
            Some(idx) => {
                for (i, c) in chars.iter().enumerate() {
                    out.push(*c);
                    if i == idx {
                        out.push_str(&self.symbol);
                    }
                }
            }
            None => out.push_str(word),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphabetic() || c == '\'' || c == '\u{2019}'
}

impl StressMarker for DictionaryStressMarker {
    fn stressify(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 4);
        let mut word = String::new();

        for c in text.chars() {
            if is_word_char(c) {
                word.push(c);
            } else {
                if !word.is_empty() {
                    self.mark_word(&word, &mut out);
                    word.clear();
                }
                out.push(c);
            }
        }
        if !word.is_empty() {
            self.mark_word(&word, &mut out);
        }

        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
