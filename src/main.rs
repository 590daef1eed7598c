//! RFID JukeBox - Rust implementation
//!
//! Swipe an RFID card to play a track or playlist on the attached speakers.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jukebox::app::{self, Jukebox};
use jukebox::input::EvdevInput;
use jukebox::playback::PlaybackController;
use jukebox::player::VlcPlayer;
use jukebox::store::MappingStore;

/// RFID JukeBox - swipe a card, play a track
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the card -> track mapping store
    #[arg(long)]
    db: PathBuf,

    /// Device path to the RFID reader
    #[arg(short, long, default_value = "/dev/input/event0")]
    input: PathBuf,

    /// Add a new track to the jukebox: specify the track path, then swipe a card
    #[arg(short, long)]
    add: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    let store = MappingStore::new(&args.db);
    let shutdown = shutdown_signal();

    // Opening the reader is the one fatal startup step
    let input = EvdevInput::open(&args.input)?;

    if let Some(track) = &args.add {
        let code = app::enroll(input, &store, &track.to_string_lossy(), shutdown).await?;
        info!("Enrollment complete for card {}", code);
        return Ok(());
    }

    print_banner();
    info!("Mapping store: {}", args.db.display());

    let controller = PlaybackController::new(store, VlcPlayer::new());
    Jukebox::new(input, controller).run(shutdown).await?;

    info!("JukeBox shutdown complete");
    Ok(())
}

fn print_banner() {
    println!("-----------------------------------");
    println!("|             JukeBox             |");
    println!("-----------------------------------");
    println!("|       Start swiping your        |");
    println!("|       RFID cards to play        |");
    println!("|       your favorite tracks      |");
    println!("-----------------------------------");
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
