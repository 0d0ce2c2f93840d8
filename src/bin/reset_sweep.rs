//! Manual sweep of spent and long-expired password reset tokens.
//!
//! Runs the same deletion the server's background reaper performs, once,
//! and prints the number of rows removed.

use clap::Parser;
use rentalhub_recovery::config::StoreConfig;
use rentalhub_recovery::database::Database;
use rentalhub_recovery::infrastructure::observability::init_tracing;
use rentalhub_recovery::infrastructure::runtime::TokioTimeService;
use rentalhub_recovery::services::{ReaperSettings, ResetTokenReaper};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "reset-sweep")]
#[command(about = "Delete used and expired password reset tokens")]
struct Cli {
    /// Database URL (defaults to DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Keep expired tokens this many minutes past expiry
    #[arg(long)]
    retention_minutes: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "rentalhub_recovery=debug,sqlx=warn"
    } else {
        "rentalhub_recovery=info,sqlx=warn"
    };
    if let Err(e) = init_tracing(filter) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli).await {
        Ok(deleted) => {
            println!("Deleted {} password reset token(s)", deleted);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Sweep failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u64> {
    let mut config = StoreConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(minutes) = cli.retention_minutes {
        config.token_retention_minutes = minutes;
    }

    let db = Database::connect_with_timeout(
        &config.database_url,
        Duration::from_millis(config.store_timeout_ms),
    )
    .await?;
    db.run_migrations().await?;

    let reaper = ResetTokenReaper::new(
        Arc::new(db),
        Arc::new(TokioTimeService::new()),
        ReaperSettings::from_config(&config),
    );

    Ok(reaper.try_sweep().await?)
}
