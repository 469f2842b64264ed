//! Two-stage text normalization: verbalization, then stress marks.
//!
//! ```text
//! raw ──Verbalizer──▶ spoken form ──strip U+02BC──▶ StressMarker ──▶ output
//!          │ Err
//!          └──────▶ raw (logged, never propagated)
//! ```
//!
//! The verbalization model emits the modifier-letter apostrophe (ʼ, U+02BC)
//! where the input had none, so it is removed before stress marking.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::text::stress::{DictionaryStressMarker, NoStress, StressError, StressMarker};
use crate::text::verbalizer::{ApiVerbalizer, PassthroughVerbalizer, Verbalizer};

/// Default generation budget for the verbalization stage.
pub const DEFAULT_MAX_TOKENS: usize = 1024;

const SPURIOUS_APOSTROPHE: char = '\u{02BC}';

/// Owns the two model handles; cheap to share behind an `Arc`.
pub struct TextNormalizer {
    verbalizer: Arc<dyn Verbalizer>,
    stress: Arc<dyn StressMarker>,
    max_tokens: usize,
}

impl TextNormalizer {
    pub fn new(verbalizer: Arc<dyn Verbalizer>, stress: Arc<dyn StressMarker>) -> Self {
        Self {
            verbalizer,
            stress,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build both stages from config.
    ///
    /// A configured stress dictionary that cannot be loaded is an error: the
    /// caller asked for stress marks and would silently not get them.
    pub fn from_config(config: &AppConfig) -> Result<Self, StressError> {
        let verbalizer: Arc<dyn Verbalizer> = if config.verbalizer.enabled {
            Arc::new(ApiVerbalizer::from_config(&config.verbalizer))
        } else {
            log::info!("verbalization disabled; text passes through unchanged");
            Arc::new(PassthroughVerbalizer)
        };

        let stress: Arc<dyn StressMarker> = match &config.stress.dictionary {
            Some(path) => Arc::new(DictionaryStressMarker::load_from(
                path,
                config.stress.symbol.clone(),
            )?),
            None => {
                log::info!("no stress dictionary configured; stress marks disabled");
                Arc::new(NoStress)
            }
        };

        Ok(Self::new(verbalizer, stress).with_max_tokens(config.verbalizer.max_tokens))
    }

    /// Verbalize, strip U+02BC, then add stress marks.
    pub async fn normalize(&self, raw: &str) -> String {
        let verbalized = match self.verbalizer.verbalize(raw, self.max_tokens).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("verbalization failed, using raw text (len={}): {e}", raw.len());
                raw.to_string()
            }
        };

        let cleaned: String = verbalized
            .chars()
            .filter(|&c| c != SPURIOUS_APOSTROPHE)
            .collect();

        self.stress.stressify(&cleaned)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::verbalizer::VerbalizeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    struct FixedVerbalizer(String);

    #[async_trait]
    impl Verbalizer for FixedVerbalizer {
        async fn verbalize(&self, _text: &str, _max: usize) -> Result<String, VerbalizeError> {
            Ok(self.0.clone())
        }
    }

    struct FailingVerbalizer;

    #[async_trait]
    impl Verbalizer for FailingVerbalizer {
        async fn verbalize(&self, _text: &str, _max: usize) -> Result<String, VerbalizeError> {
            Err(VerbalizeError::Timeout)
        }
    }

    /// Records the budget it was called with.
    #[derive(Default)]
    struct BudgetProbe(AtomicUsize);

    #[async_trait]
    impl Verbalizer for BudgetProbe {
        async fn verbalize(&self, text: &str, max: usize) -> Result<String, VerbalizeError> {
            self.0.store(max, Ordering::SeqCst);
            Ok(text.to_string())
        }
    }

    /// Wraps its input in brackets and remembers what it saw.
    #[derive(Default)]
    struct BracketStress(Mutex<Vec<String>>);

    impl StressMarker for BracketStress {
        fn stressify(&self, text: &str) -> String {
            self.0.lock().unwrap().push(text.to_string());
            format!("[{text}]")
        }
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn stress_runs_on_verbalized_text() {
        let normalizer = TextNormalizer::new(
            Arc::new(FixedVerbalizer("двадцять п'ять".into())),
            Arc::new(BracketStress::default()),
        );
        assert_eq!(normalizer.normalize("25").await, "[двадцять п'ять]");
    }

    #[tokio::test]
    async fn verbalization_failure_falls_back_to_raw() {
        let normalizer =
            TextNormalizer::new(Arc::new(FailingVerbalizer), Arc::new(BracketStress::default()));
        assert_eq!(normalizer.normalize("39,5 грн").await, "[39,5 грн]");
    }

    #[tokio::test]
    async fn modifier_apostrophe_is_stripped_before_stress() {
        let stress = Arc::new(BracketStress::default());
        let normalizer = TextNormalizer::new(
            Arc::new(FixedVerbalizer("пʼять мʼяч".into())),
            Arc::clone(&stress) as Arc<dyn StressMarker>,
        );

        let out = normalizer.normalize("5 м'яч").await;

        assert_eq!(out, "[пять мяч]");
        assert_eq!(stress.0.lock().unwrap().as_slice(), ["пять мяч"]);
    }

    #[tokio::test]
    async fn plain_apostrophe_is_kept() {
        let normalizer =
            TextNormalizer::new(Arc::new(PassthroughVerbalizer), Arc::new(NoStress));
        assert_eq!(normalizer.normalize("м'яч").await, "м'яч");
    }

    #[tokio::test]
    async fn default_budget_is_1024() {
        let probe = Arc::new(BudgetProbe::default());
        let normalizer =
            TextNormalizer::new(Arc::clone(&probe) as Arc<dyn Verbalizer>, Arc::new(NoStress));
        normalizer.normalize("текст").await;
        assert_eq!(probe.0.load(Ordering::SeqCst), 1024);
    }

    #[tokio::test]
    async fn configured_budget_is_forwarded() {
        let probe = Arc::new(BudgetProbe::default());
        let normalizer =
            TextNormalizer::new(Arc::clone(&probe) as Arc<dyn Verbalizer>, Arc::new(NoStress))
                .with_max_tokens(256);
        normalizer.normalize("текст").await;
        assert_eq!(probe.0.load(Ordering::SeqCst), 256);
    }

    #[test]
    fn from_config_without_dictionary_succeeds() {
        let mut config = AppConfig::default();
        config.verbalizer.enabled = false;
        assert!(TextNormalizer::from_config(&config).is_ok());
    }

    #[test]
    fn from_config_with_missing_dictionary_fails() {
        let mut config = AppConfig::default();
        config.stress.dictionary = Some("/nonexistent/stress.json".into());
        assert!(matches!(
            TextNormalizer::from_config(&config),
            Err(StressError::Io { .. })
        ));
    }
}
