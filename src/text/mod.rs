//! Text pre-processing for synthesis.
//!
//! * [`Verbalizer`]: async trait; [`ApiVerbalizer`] (hosted model) and
//!   [`PassthroughVerbalizer`].
//! * [`StressMarker`]: sync trait; [`DictionaryStressMarker`] and [`NoStress`].
//! * [`TextNormalizer`]: runs both, absorbing verbalization failures.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ukrainian_tts::config::AppConfig;
//! use ukrainian_tts::text::TextNormalizer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let normalizer = TextNormalizer::from_config(&config).unwrap();
//!     let text = normalizer.normalize("Подорож триває 5 год 30 хв.").await;
//!     println!("{text}");
//! }
//! ```

pub mod normalizer;
pub mod stress;
pub mod verbalizer;

pub use normalizer::{TextNormalizer, DEFAULT_MAX_TOKENS};
pub use stress::{DictionaryStressMarker, NoStress, StressError, StressMarker};
pub use verbalizer::{ApiVerbalizer, PassthroughVerbalizer, VerbalizeError, Verbalizer};
