//! Entry point: loads configuration, opens the stores, and runs the
//! ingestion, query, and memory-trimmer tasks as cooperating async tasks
//! sharing nothing but a watermark and a shutdown flag.

mod config;
mod ingestion;
mod shutdown;
mod trimmer;

use std::path::PathBuf;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::Config;
use shutdown::ShutdownFlag;
use utxoidx_rpc::AppState;
use utxoidx_state::Store;

#[derive(Parser, Debug)]
#[command(author, version, about = "Bitcoin UTXO chain indexer", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if args.debug { "debug" } else { "info" };
        EnvFilter::new(level)
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration, falling back to defaults");
            Config::default()
        }
    };

    info!(upstream_mode = ?config.upstream_mode, upstream_url = %config.upstream_url, "starting utxoidx-node");

    let store = Arc::new(Store::open(&config.state_config())?);
    let watermark = Arc::new(AtomicU32::new(store.start_block_height()?));
    let shutdown = ShutdownFlag::new();

    let client: Arc<dyn utxoidx_client::UpstreamClient> =
        Arc::from(utxoidx_client::build_client(config.upstream_mode.into(), &config.upstream_url));

    let app_state = Arc::new(AppState::new((*store).clone(), watermark.clone()));

    let mut ingestion_task = tokio::spawn(ingestion::run(
        client,
        store.clone(),
        watermark.clone(),
        config.object_cache_weight_max,
        config.store_raw_trx,
        shutdown.clone(),
    ));

    let rpc_endpoint = config.server_endpoint;
    let rpc_task = tokio::spawn(async move {
        if let Err(err) = utxoidx_rpc::serve(rpc_endpoint, app_state).await {
            error!(%err, "query server exited");
        }
    });

    let trimmer_task = tokio::spawn(trimmer::run(config.heap_idle_size_max, shutdown.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
        result = &mut ingestion_task => {
            if let Err(err) = result {
                error!(%err, "ingestion task panicked");
            }
        }
    }

    // Always give ingestion a chance to run its final flush, whichever
    // branch above fired.
    shutdown.set();
    if !ingestion_task.is_finished() {
        let _ = ingestion_task.await;
    }
    rpc_task.abort();
    trimmer_task.abort();

    info!("utxoidx-node shut down cleanly");
    Ok(())
}
