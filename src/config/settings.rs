//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::request::DecodingParams;

// ---------------------------------------------------------------------------
// ReferenceConfig
// ---------------------------------------------------------------------------

/// Where reference voices live and how their files are named.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Directory scanned (non-recursively) for reference pairs.
    pub dir: PathBuf,
    /// Extension of the audio half of a pair, without the dot.
    pub audio_extension: String,
    /// Extension of the transcript half of a pair, without the dot.
    pub transcript_extension: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            dir: AppPaths::new().references_dir,
            audio_extension: "wav".into(),
            transcript_extension: "lab".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Connection settings for the TTS inference server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the server; requests go to `{base_url}/v1/tts`.
    pub base_url: String,
    /// Maximum seconds to wait for one synthesis call.
    pub timeout_secs: u64,
    /// Run a reference-less dry run before serving the first request.
    pub warm_up: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            timeout_secs: 300,
            warm_up: true,
        }
    }
}

// ---------------------------------------------------------------------------
// VerbalizerConfig
// ---------------------------------------------------------------------------

/// Settings for the text verbalization stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerbalizerConfig {
    /// When `false` the verbalization stage passes text through unchanged.
    pub enabled: bool,
    /// Base URL of the model-hosting endpoint.
    pub base_url: String,
    /// API key: `None` for local endpoints.
    pub api_key: Option<String>,
    /// Model identifier appended to `{base_url}/models/`.
    pub model: String,
    /// Token budget handed to the model for a single input.
    pub max_tokens: usize,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
}

impl Default for VerbalizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api-inference.huggingface.co".into(),
            api_key: None,
            model: "skypro1111/mbart-large-50-verbalization".into(),
            max_tokens: 1024,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// StressConfig
// ---------------------------------------------------------------------------

/// Settings for the stress annotation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// JSON stress dictionary. `None` disables stress marks.
    pub dictionary: Option<PathBuf>,
    /// Symbol inserted after the stressed vowel.
    pub symbol: String,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            dictionary: None,
            symbol: "\u{02C8}".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper engine that transcribes uploaded references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// GGML model file stem under the models directory.
    pub model: String,
    /// ISO-639-1 language code, or `"auto"`.
    pub language: String,
    /// Beam width used for decoding.
    pub beam_size: i32,
    /// Prompt fed to the decoder before the first window.
    pub initial_prompt: Option<String>,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "ggml-large-v3-turbo".into(),
            language: "uk".into(),
            beam_size: 5,
            initial_prompt: Some("Це транскрипція українською мовою.".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Admission limits applied by the presentation boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Concurrent synthesis requests.
    pub synthesis_concurrency: usize,
    /// Concurrent transcription requests.
    pub transcription_concurrency: usize,
    /// Requests allowed to wait or run at once across both lanes.
    pub max_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            synthesis_concurrency: 1,
            transcription_concurrency: 1,
            max_size: 40,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use ukrainian_tts::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Reference voice directory layout.
    pub references: ReferenceConfig,
    /// TTS inference server.
    pub engine: EngineConfig,
    /// Verbalization stage.
    pub verbalizer: VerbalizerConfig,
    /// Stress annotation stage.
    pub stress: StressConfig,
    /// Reference transcription.
    pub stt: SttConfig,
    /// Decoding parameters used when the caller supplies none.
    pub decoding: DecodingParams,
    /// Request admission limits.
    pub queue: QueueConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Full path of the configured Whisper model file.
    pub fn stt_model_path(&self) -> PathBuf {
        AppPaths::new()
            .models_dir
            .join(format!("{}.bin", self.stt.model))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
