use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use voice_study_core::env_config::env_parse_with_default;
use voice_study_core::{Condition, Group, PG_POOL_MAX_CONNECTIONS, TaskId};
use voice_study_storage::StorageBackend;

mod commands;

#[derive(Parser)]
#[command(name = "voice-study")]
#[command(about = "Backend for the voice-assistant Latin-square study", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Apply schema migrations to the configured database and exit
    Migrate,
    /// Print the task/condition plan for one group, or all nine
    Plan {
        #[arg(short, long)]
        group: Option<Group>,
    },
    /// Register a participant (idempotent) and print its assignments
    Register {
        id: String,
        #[arg(short, long)]
        group: Option<Group>,
    },
    /// List participants, newest first, with per-group counts
    Participants,
    /// Show stored progress checkpoints for a participant
    Progress { participant_id: String },
    /// Manage curated playback audio
    Playback {
        #[command(subcommand)]
        command: PlaybackCommands,
    },
}

#[derive(Subcommand)]
enum PlaybackCommands {
    /// Set the audio URL of an existing playback asset
    Set {
        participant_id: String,
        #[arg(long)]
        task: TaskId,
        #[arg(long)]
        condition: Condition,
        #[arg(long)]
        url: String,
    },
    /// List playback assets for a participant
    List { participant_id: String },
}

pub(crate) fn get_db_path() -> PathBuf {
    std::env::var_os("VOICE_STUDY_DB_PATH").map_or_else(
        || {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("voice-study")
                .join("study.db")
        },
        PathBuf::from,
    )
}

pub(crate) fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set, the local SQLite file otherwise.
/// Opening a backend runs its migrations.
pub(crate) async fn open_storage() -> Result<Arc<StorageBackend>> {
    let backend = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let max_connections =
                env_parse_with_default("VOICE_STUDY_PG_MAX_CONNECTIONS", PG_POOL_MAX_CONNECTIONS);
            tracing::info!(max_connections, "using PostgreSQL backend");
            StorageBackend::new_postgres(&url, max_connections).await?
        },
        _ => {
            let db_path = get_db_path();
            ensure_db_dir(&db_path)?;
            tracing::info!(path = %db_path.display(), "using SQLite backend");
            StorageBackend::new_sqlite(&db_path)?
        },
    };
    Ok(Arc::new(backend))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Plan { group } => commands::admin::run_plan(group)?,
        Commands::Register { id, group } => commands::admin::run_register(&id, group).await?,
        Commands::Participants => commands::admin::run_participants().await?,
        Commands::Progress { participant_id } => {
            commands::admin::run_progress(&participant_id).await?;
        },
        Commands::Playback { command } => match command {
            PlaybackCommands::Set { participant_id, task, condition, url } => {
                commands::admin::run_playback_set(&participant_id, task, condition, &url).await?;
            },
            PlaybackCommands::List { participant_id } => {
                commands::admin::run_playback_list(&participant_id).await?;
            },
        },
    }

    Ok(())
}
