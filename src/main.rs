use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use recon_core::Config;
use recon_core::bootstrap::{build_ingestion_pipeline, build_query_service};
use recon_core::config::resolve_config_path;
use recon_gateway::GatewayServer;
use tokio::sync::watch;

/// Repository indexing and retrieval-augmented query service.
#[derive(Debug, Parser)]
#[command(name = "recon", version, about)]
struct Cli {
    /// TOML config file. Falls back to `RECON_CONFIG`, then `config/recon.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index every source file under a repository into the vector store.
    Ingest {
        repository_path: PathBuf,

        /// Seconds to wait for Qdrant and the embedder to become healthy.
        #[arg(long, default_value_t = 0)]
        wait: u64,
    },
    /// Serve the query API.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;

    match cli.command {
        Command::Ingest {
            repository_path,
            wait,
        } => ingest(&config, &repository_path, wait).await,
        Command::Serve => serve(&config).await,
    }
}

async fn ingest(config: &Config, repository_path: &Path, wait_secs: u64) -> anyhow::Result<()> {
    if !repository_path.is_dir() {
        bail!(
            "repository path does not exist: {}",
            repository_path.display()
        );
    }

    tracing::info!(
        repository = %repository_path.display(),
        collection = %config.index.collection,
        qdrant = %config.qdrant.url,
        embedder = %config.embedding.url,
        "starting ingestion"
    );

    let pipeline = build_ingestion_pipeline(config)?;
    if wait_secs > 0 {
        pipeline
            .wait_for_services(Duration::from_secs(wait_secs))
            .await;
    }

    let report = pipeline
        .run(repository_path)
        .await
        .context("ingestion failed")?;

    println!("{report}");
    if report.is_degraded() {
        tracing::warn!(
            batches_failed = report.batches_failed,
            missing = report.chunks_generated.saturating_sub(report.chunks_indexed),
            "ingestion finished with partial coverage, re-run to fill the gaps"
        );
    }
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(build_query_service(config)?);

    tracing::info!(
        qdrant = %config.qdrant.url,
        collection = %config.index.collection,
        llm = %config.llm.url,
        embedder = %config.embedding.url,
        "query service ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.server.bind,
        config.server.port,
        service,
        shutdown_rx,
    )
    .with_max_body_size(config.server.max_body_size)
    .serve()
    .await?;

    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
