use clap::Parser;
use eth_tx_indexer::api::{ApiServer, QueryFacade};
use eth_tx_indexer::blockchain::{RpcClient, SyncEngine};
use eth_tx_indexer::config::AppConfig;
use eth_tx_indexer::logging::{init_logging, LogContext};
use eth_tx_indexer::store::{MemoryStore, TransactionStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "eth-tx-indexer")]
#[command(about = "Indexes Ethereum transactions touching a watch list of addresses")]
#[command(version)]
struct Args {
    /// Configuration file (defaults to $CONFIG_FILE or ./config.toml)
    #[arg(long)]
    config: Option<String>,

    /// JSON-RPC endpoint, overrides config and ETH_RPC_URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// HTTP port, overrides config and API_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    sample_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.sample_config {
        println!("{}", AppConfig::generate_sample_config()?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(rpc_url) = args.rpc_url {
        config.rpc.endpoint = rpc_url;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    config.validate()?;

    init_logging(&config.logging)?;

    let log = LogContext::new("main", "startup");
    log.info(&format!(
        "Starting indexer (rpc={}, api={})",
        config.rpc.endpoint,
        config.api.bind_address()
    ));

    let shutdown = CancellationToken::new();
    let store: Arc<dyn TransactionStore> = Arc::new(MemoryStore::new());
    let client = Arc::new(RpcClient::new(&config.rpc)?);

    let engine = SyncEngine::new(client, store.clone(), config.sync.clone(), shutdown.clone());
    let sync_task = tokio::spawn(async move { engine.run().await });

    let server = ApiServer::new(Arc::new(QueryFacade::new(store)), &config.api);
    let server_shutdown = shutdown.clone();
    let server_task = tokio::spawn(async move {
        let result = server.start(server_shutdown.clone()).await;
        server_shutdown.cancel();
        result
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                log.error(&format!("Failed to listen for shutdown signal: {}", e));
            }
            log.info("Shutdown requested");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    if let Err(e) = sync_task.await {
        log.error(&format!("Sync task panicked: {}", e));
    }
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            log.error(&format!("Server failed: {}", e));
            return Err(e.into());
        }
        Err(e) => log.error(&format!("Server task panicked: {}", e)),
    }

    log.info("Indexer stopped");
    Ok(())
}
