/// discodj console - drive a music room from the terminal
use clap::{Parser, Subcommand};
use discodj_console::{shutdown_signal, ConsoleConfig, Session};
use discodj_core::RoomId;
use discodj_storage::{JsonSnapshotStore, PlaylistStore};
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "discodj-console")]
#[command(about = "discodj playback core driven from the terminal", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "DISCODJ_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session
    Run,
    /// Print a room's saved snapshot
    Inspect {
        /// Room id
        room: String,
    },
    /// List a room's saved playlists
    Playlists {
        /// Room id
        room: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "discodj_console=info,discodj_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ConsoleConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => run(&config).await?,
        Commands::Inspect { room } => inspect(&config, &room).await?,
        Commands::Playlists { room } => list_playlists(&config, &room).await?,
    }

    Ok(())
}

async fn run(config: &ConsoleConfig) -> anyhow::Result<()> {
    tracing::info!("Starting discodj console");
    tracing::info!("Room: {}", config.console.room_id);
    tracing::info!("Data directory: {}", config.storage.data_dir.display());

    let session = Session::from_config(config)?;
    let restored = session.restore().await?;
    if restored > 0 {
        tracing::info!("Restored {} queued tracks", restored);
    }
    println!("Type 'help' for commands.");

    let stdin = BufReader::new(tokio::io::stdin());
    session.run_until(stdin, shutdown_signal()).await?;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn inspect(config: &ConsoleConfig, room: &str) -> anyhow::Result<()> {
    let store = JsonSnapshotStore::new(config.storage.data_dir.clone());
    let room = RoomId::new(room);
    match store.read(&room).await? {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("No saved state for room {}", room),
    }
    Ok(())
}

async fn list_playlists(config: &ConsoleConfig, room: &str) -> anyhow::Result<()> {
    let store = PlaylistStore::new(config.storage.data_dir.clone());
    let playlists = store.list(&RoomId::new(room)).await?;
    if playlists.is_empty() {
        println!("No saved playlists");
    }
    for playlist in playlists {
        println!("{} ({} tracks)", playlist.name, playlist.count);
    }
    Ok(())
}
