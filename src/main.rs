//! Application entry point: Ukrainian TTS front-end.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] (returns defaults on first run).
//! 4. Build the engine client and the [`SynthesisPipeline`].
//! 5. Create the [`tokio`] runtime and run the subcommand on it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use ukrainian_tts::{
    config::AppConfig,
    inference::{HttpEngine, SynthesisEngine},
    pipeline::SynthesisPipeline,
    reference::ReferenceCatalog,
    request::{DecodingParams, ReferenceSelection},
};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Ukrainian text-to-speech with reference voice cloning.
#[derive(Parser, Debug)]
#[command(name = "ukrainian-tts")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference voice directory (overrides the config file)
    #[arg(long, global = true)]
    references: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the reference voices found in the reference directory
    References,

    /// Synthesize speech and write it to a WAV file
    Synthesize(SynthesizeArgs),

    /// Transcribe a reference recording with Whisper
    Transcribe {
        /// WAV file to transcribe
        audio: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SynthesizeArgs {
    /// Text to synthesize
    #[arg(short, long)]
    text: String,

    /// Catalog voice to clone
    #[arg(short, long)]
    reference: Option<String>,

    /// Custom reference recording (used together with --custom-text)
    #[arg(long)]
    custom_audio: Option<PathBuf>,

    /// Transcript of the custom reference recording
    #[arg(long)]
    custom_text: Option<String>,

    /// Output WAV file path
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// Maximum number of tokens to generate (0 = engine default)
    #[arg(long)]
    max_new_tokens: Option<i64>,

    /// Iterative prompt length (0 = off)
    #[arg(long)]
    chunk_length: Option<i64>,

    /// Nucleus sampling threshold
    #[arg(long)]
    top_p: Option<f32>,

    /// Repetition penalty
    #[arg(long)]
    repetition_penalty: Option<f32>,

    /// Sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Random seed (0 = random)
    #[arg(long)]
    seed: Option<i64>,

    /// Skip the engine warm-up request
    #[arg(long)]
    no_warm_up: bool,
}

impl SynthesizeArgs {
    fn selection(&self) -> ReferenceSelection {
        if self.custom_audio.is_some() || self.custom_text.is_some() {
            ReferenceSelection::CustomUpload {
                audio_path: self.custom_audio.clone(),
                transcript: self.custom_text.clone().unwrap_or_default(),
                catalog: self.reference.clone(),
            }
        } else if let Some(name) = &self.reference {
            ReferenceSelection::Catalog(name.clone())
        } else {
            ReferenceSelection::None
        }
    }

    fn params(&self, defaults: &DecodingParams) -> DecodingParams {
        DecodingParams {
            max_new_tokens: self.max_new_tokens.unwrap_or(defaults.max_new_tokens),
            chunk_length: self.chunk_length.unwrap_or(defaults.chunk_length),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            repetition_penalty: self.repetition_penalty.unwrap_or(defaults.repetition_penalty),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            seed: self.seed.or(defaults.seed),
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Config
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if let Some(dir) = &cli.references {
        config.references.dir = dir.clone();
    }

    if let Command::References = cli.command {
        list_references(&config);
        return Ok(());
    }

    // 4. Engine + pipeline. The engine owns a blocking HTTP client, which
    //    must be created and dropped outside the async runtime.
    let engine: Arc<dyn SynthesisEngine> = Arc::new(HttpEngine::from_config(&config.engine));
    let pipeline = SynthesisPipeline::from_config(&config, engine)
        .context("failed to build the synthesis pipeline")?;

    // 5. Tokio runtime (2 worker threads; blocking work goes to the blocking pool)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let result = rt.block_on(async {
        match &cli.command {
            Command::Synthesize(args) => synthesize(&pipeline, &config, args).await,
            Command::Transcribe { audio } => {
                let text = pipeline.transcribe_reference(Some(audio.as_path())).await;
                if text.is_empty() {
                    bail!("no transcript produced for {}", audio.display());
                }
                println!("{text}");
                Ok(())
            }
            Command::References => Ok(()),
        }
    });

    pipeline.shutdown();
    drop(rt);
    drop(pipeline);
    result
}

fn list_references(config: &AppConfig) {
    let catalog = ReferenceCatalog::scan(&config.references);
    if catalog.is_empty() {
        println!("No reference voices in {}", config.references.dir.display());
        return;
    }
    for voice in catalog.voices() {
        println!("{}\t{}", voice.name(), voice.transcript());
    }
}

async fn synthesize(
    pipeline: &SynthesisPipeline,
    config: &AppConfig,
    args: &SynthesizeArgs,
) -> Result<()> {
    if config.engine.warm_up && !args.no_warm_up {
        log::info!("Warming up the TTS engine...");
        pipeline.warm_up().await;
    }

    let response = pipeline
        .synthesize(&args.text, &args.selection(), &args.params(&config.decoding))
        .await;

    if let Some(error) = response.error {
        bail!("{error}");
    }

    let Some(audio) = response.audio else {
        bail!("engine returned no audio");
    };
    std::fs::write(&args.output, &audio)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(text) = response.normalized_text {
        log::info!("Normalized text: {text}");
    }
    println!("Wrote {} ({} bytes)", args.output.display(), audio.len());
    Ok(())
}
