use chain_replayer::{
    chain::{ChainReader, RpcChain},
    config::Cli,
    driver::ReplayDriver,
    logging,
    rpc_server::RpcServer,
};
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    info!("Starting chain-replayer v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.replay_config()?;
    let keystore = cli.keystore()?;
    let retry = cli.retry_policy();

    let source = RpcChain::connect("source", &cli.source_rpc_url, retry).await?;
    let target = RpcChain::connect("target", &cli.target_rpc_url, retry).await?;
    info!(
        rpc_url = %cli.source_rpc_url,
        head = source.latest_block_number().await?,
        "Connected to {} chain",
        source.label()
    );
    info!(
        rpc_url = %cli.target_rpc_url,
        head = target.latest_block_number().await?,
        "Connected to {} chain",
        target.label()
    );

    let driver = ReplayDriver::new(&source, &target, keystore.as_ref(), &config);

    let status_server = match cli.status_addr {
        Some(addr) => {
            let server = RpcServer::new(addr, driver.progress()).await?;
            info!("Serving replay_status on http://{}", server.local_addr());
            Some(server)
        }
        None => None,
    };

    let outcome = driver.run().await;

    if let Some(server) = status_server {
        server.stop().await?;
    }

    match outcome {
        Ok(report) => {
            info!(
                blocks = report.blocks_replayed,
                skipped = report.blocks_skipped,
                transactions = report.transactions_submitted,
                "Replay complete"
            );
            for hash in &report.failed_receipts {
                info!(%hash, "Included with failed status");
            }
            Ok(())
        }
        Err(e) => {
            error!(kind = %e.kind(), "Replay aborted: {}", e);
            Err(e.into())
        }
    }
}
