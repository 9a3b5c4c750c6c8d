use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use bfs_coord::ClusterLayout;
use bfs_directory::{
    Directory, DirectoryApi, DirectoryConfig, Dispatcher, LocalKeyGenerator, TopologySync,
};
use bfs_kv_backends::MemKvStore;
use bfs_utils::BackgroundRunner;

/// Blob store directory server
#[derive(Parser, Debug)]
#[command(name = "bfs-directory-server", version, about)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Static cluster layout (JSON) served as the coordination tree
    #[arg(short, long)]
    layout: PathBuf,

    /// Dump default configuration and exit
    #[arg(long)]
    dump_default_config: bool,
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to register SIGTERM handler")?;
    tokio::select! {
        r = tokio::signal::ctrl_c() => {
            r.context("failed to listen for CTRL+C")?;
            tracing::info!("Received CTRL+C");
        }
        _ = sigterm.recv() => { tracing::info!("Received SIGTERM"); }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.dump_default_config {
        print!("{}", toml::to_string_pretty(&DirectoryConfig::default())?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => DirectoryConfig::load(path)?,
        None => DirectoryConfig::default(),
    };
    let _log_guard = bfs_logging::init_logging(&config.log)?;

    tracing::info!(config = ?args.config, layout = %args.layout.display(), "Starting directory server");

    let coord = Arc::new(
        ClusterLayout::load(&args.layout)
            .with_context(|| format!("loading layout {}", args.layout.display()))?
            .into_coord(),
    );
    let dispatcher = Arc::new(Dispatcher::new(config.volume_min_free_space));
    let directory = Arc::new(Directory::new(
        &config,
        Arc::clone(&dispatcher),
        MemKvStore::new(),
        LocalKeyGenerator::new(),
    ));
    let api = DirectoryApi::new(Arc::clone(&directory));

    let sync = TopologySync::new(coord, Arc::clone(&dispatcher), &config);
    if let Err(e) = sync.run_once().await {
        tracing::warn!(error = %e, "initial topology sync failed, retrying in background");
    }
    let mut runner = BackgroundRunner::new();
    runner.spawn("topology-sync", move |shutdown| sync.run(shutdown));

    tracing::info!(
        ready = directory.is_ready(),
        ping = bfs_directory::api::ret_name(api.ping().ret),
        "Directory server initialization complete"
    );
    wait_for_shutdown_signal().await?;

    tracing::info!("Directory server shutting down");
    runner.shutdown().await;
    Ok(())
}
