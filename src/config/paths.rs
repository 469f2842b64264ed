//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\ukrainian-tts\
//!   macOS:   ~/Library/Application Support/ukrainian-tts/
//!   Linux:   ~/.config/ukrainian-tts/
//!
//! Data dir (models, reference voices):
//!   Windows: %LOCALAPPDATA%\ukrainian-tts\
//!   macOS:   ~/Library/Application Support/ukrainian-tts/
//!   Linux:   ~/.local/share/ukrainian-tts/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML Whisper model files.
    pub models_dir: PathBuf,
    /// Default directory scanned for `<name>.wav` + `<name>.lab` pairs.
    pub references_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "ukrainian-tts";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let models_dir = data_dir.join("models");
        let references_dir = data_dir.join("references");

        Self {
            config_dir,
            settings_file,
            models_dir,
            references_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
