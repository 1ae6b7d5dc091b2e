mod commands;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tgwh_pipeline::StageName;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tgwh")]
#[command(about = "Channel content ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline once, now
    Run {
        /// Start at this stage instead of SCRAPE (e.g. `load-raw`)
        #[arg(long)]
        from_stage: Option<StageName>,
    },
    /// Run the pipeline on the configured cron schedule until interrupted
    Schedule,
    /// Scrape channels into the lake (SCRAPE stage only)
    Scrape {
        /// Scrape only this configured channel
        #[arg(long)]
        channel: Option<String>,
    },
    /// Load landed batches into the raw store (LOAD_RAW stage only)
    LoadRaw,
    /// Load a classifier detections CSV into the raw store
    LoadDetections {
        /// Defaults to `TGWH_DETECTIONS_CSV`
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Arc::new(tgwh_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(config = ?config, "configuration loaded");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    match cli.command {
        Commands::Run { from_stage } => {
            let pool = connect(&config).await?;
            commands::run_pipeline(&config, pool, from_stage, &cancel).await
        }
        Commands::Schedule => {
            let pool = connect(&config).await?;
            scheduler::run_scheduled(Arc::clone(&config), pool, cancel).await
        }
        Commands::Scrape { channel } => commands::run_scrape(&config, channel.as_deref()).await,
        Commands::LoadRaw => commands::run_load_raw(&config, &connect(&config).await?).await,
        Commands::LoadDetections { csv } => {
            let path = csv.unwrap_or_else(|| config.detections_csv.clone());
            commands::run_load_detections(&connect(&config).await?, &path).await
        }
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            run_db(command, &pool).await
        }
    }
}

async fn connect(config: &tgwh_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = tgwh_db::PoolConfig::from_app_config(config);
    Ok(tgwh_db::connect_pool(&config.database_url, pool_config).await?)
}

async fn run_db(command: DbCommands, pool: &sqlx::PgPool) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let applied = tgwh_db::run_migrations(pool).await?;
            println!("migrations applied ({applied} new)");
        }
        DbCommands::Ping => {
            tgwh_db::ping(pool).await?;
            println!("database reachable");
        }
    }
    Ok(())
}

/// Cancels `token` on Ctrl-C or SIGTERM.
async fn cancel_on_shutdown(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping at the next stage boundary");
    token.cancel();
}
