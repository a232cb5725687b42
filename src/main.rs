//! Batchboard server entry point.

use anyhow::Result;
use batchboard::api::{self, AppState};
use batchboard::cli::{Cli, Command};
use batchboard::config::ServerConfig;
use batchboard::db::Database;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ServerConfig::load(cli.config.as_deref().map(Path::new))?;
    if let Some(database) = cli.database {
        config.database = Some(database.into());
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let db_path = config.database_path();
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => {
            // Opening runs any pending migrations.
            Database::open(&db_path)?;
            info!("Database migrated: {}", db_path.display());
        }
        Command::Serve => {
            let db = Arc::new(Database::open(&db_path)?);
            info!("Database: {}", db_path.display());

            let state = AppState::new(db);
            let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
            api::server::serve(state, addr, &config.cors_origins).await?;
        }
    }

    Ok(())
}
