use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hotspot_common::{config::load_config, AppConfig};
use hotspot_daemon::Runner;
use hotspot_engine::Engine;
use hotspot_store::{PgCheckpointStore, PgClusterSink, PgMessageSource};

#[derive(Parser)]
#[command(name = "hotspot-daemon", about = "Incremental spatio-textual event clustering")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./config/hotspot.toml")]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive("hotspot=info".parse()?);
    if cli.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(config = %cli.config.display(), "Loading config");
    let file_config = load_config(&cli.config)
        .with_context(|| format!("Invalid config {}. Create one or specify --config <path>", cli.config.display()))?;

    let config = AppConfig::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    info!(max_connections = config.max_connections, "Connected to database");

    hotspot_store::migrate(&pool).await?;
    info!("Migrations complete");

    let engine = Engine::new(&file_config)?;
    let mut runner = Runner::resume(
        engine,
        Arc::new(PgMessageSource::new(pool.clone())),
        Arc::new(PgClusterSink::new(pool.clone())),
        Arc::new(PgCheckpointStore::new(pool)),
        file_config.timing.period,
        file_config.timing.start,
    )
    .await?;

    if cli.once {
        let report = runner.run_cycle().await?;
        info!(%report, "Single cycle finished");
        return Ok(());
    }

    runner.run().await
}
