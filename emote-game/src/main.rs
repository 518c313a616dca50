//! Emote game (emote-game) - Main entry point
//!
//! Headless build of the game: the display feed goes to the log and the
//! controls are read from stdin (see `console`). A windowed shell embeds the
//! library the same way, subscribing to the event bus instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emote_common::config::{resolve_config_file, resolve_leaderboard_path, TomlConfig};
use emote_common::events::EventBus;
use emote_common::LeaderboardStore;
use emote_game::capture::{DirectorySource, FrameSource, SyntheticSource};
use emote_game::console::{spawn_console, USAGE};
use emote_game::controller::GameController;
use emote_game::inference::{DemoClassifier, EmotionClassifier, InferenceAdapter, ProcessClassifier};
use emote_game::pipeline::{FramePipeline, PipelineOptions};
use emote_game::round::RoundMachine;
use emote_game::scheduler;

/// Synthetic frame size when no frame folder is given
const SYNTHETIC_WIDTH: u32 = 640;
const SYNTHETIC_HEIGHT: u32 = 480;

/// Command-line arguments for emote-game
#[derive(Parser, Debug)]
#[command(name = "emote-game")]
#[command(about = "Act out an emotion and climb the leaderboard")]
#[command(version)]
struct Args {
    /// Configuration file (overrides EMOTE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Leaderboard file (overrides EMOTE_LEADERBOARD and the config file)
    #[arg(short, long)]
    leaderboard: Option<PathBuf>,

    /// Folder of image files to replay as the camera feed
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Seed for target selection and the demo classifier
    #[arg(long)]
    seed: Option<u64>,

    /// Log level when RUST_LOG is not set (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    /// External classifier after `--`: reads a PNG on stdin, prints JSON
    #[arg(last = true, value_name = "CLASSIFIER")]
    classifier: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_file(args.config.as_deref());
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    let level = args.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("emote_game={level},emote_common={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting emote-game {} ({}, {} build, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    // Frame source: failing to open it is the one fatal startup error
    let source = open_source(args.frames.as_deref()).context("Failed to open frame source")?;

    let classifier: Box<dyn EmotionClassifier> =
        match ProcessClassifier::from_argv(args.classifier.iter().cloned()) {
            Some(classifier) => {
                info!("Classifier command: {}", classifier.program());
                Box::new(classifier)
            }
            None => {
                warn!("No classifier command configured, using the demo classifier");
                let demo = match args.seed {
                    Some(seed) => DemoClassifier::with_seed(seed),
                    None => DemoClassifier::new(),
                };
                Box::new(demo)
            }
        };

    if config.display.secondary_detector {
        warn!("display.secondary_detector is set but this build has no secondary detector");
    }

    let pipeline = FramePipeline::new(
        source,
        InferenceAdapter::new(classifier),
        PipelineOptions::from(&config.display),
    );

    let leaderboard_path = resolve_leaderboard_path(args.leaderboard.as_deref(), &config);
    let leaderboard = LeaderboardStore::load(&leaderboard_path);
    info!("Leaderboard: {} ({} entries)", leaderboard_path.display(), leaderboard.leaderboard().len());

    let round = match args.seed {
        Some(seed) => RoundMachine::with_seed(config.game.target_set, seed),
        None => RoundMachine::new(config.game.target_set),
    };

    let events = Arc::new(EventBus::default());
    let mut controller = GameController::new(
        round,
        leaderboard,
        events,
        config.game.enabled,
        config.display.leaderboard_size,
    );

    for line in controller.leaderboard_view() {
        info!("  {}", line);
    }
    if config.game.enabled {
        info!("{}", USAGE);
    } else {
        info!("Scoring game disabled; showing the live readout only");
    }

    let (tx, rx) = mpsc::channel(32);
    // Not joined: the reader may still be parked on stdin at exit
    spawn_console(tx).context("Failed to start console")?;

    let summary = scheduler::run(
        &mut controller,
        pipeline,
        Duration::from_millis(config.pipeline.tick_interval_ms),
        rx,
        shutdown_signal(),
    )
    .await
    .context("Pipeline failed")?;

    info!(
        "Shutdown complete after {} ticks ({:?})",
        summary.stats.ticks, summary.reason
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> emote_game::Result<TomlConfig> {
    Ok(TomlConfig::load(path)?)
}

fn open_source(frames: Option<&Path>) -> emote_game::Result<Box<dyn FrameSource>> {
    let source: Box<dyn FrameSource> = match frames {
        Some(dir) => Box::new(DirectorySource::open(dir)?),
        None => {
            warn!("No frame folder given, using synthetic frames");
            Box::new(SyntheticSource::new(SYNTHETIC_WIDTH, SYNTHETIC_HEIGHT)?)
        }
    };
    Ok(source)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
