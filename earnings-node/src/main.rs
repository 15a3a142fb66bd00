mod cli;
mod config;
mod init;
mod logger;
mod sweep;

use anyhow::Context;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    logger::init();

    let args = cli::NodeArgs::from_env()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build the tokio runtime")?;

    rt.block_on(run(args))
}

async fn run(args: cli::NodeArgs) -> anyhow::Result<()> {
    let node = init::init(args)?;
    info!(url = %node.server_url, "earnings-node listening");

    let shutdown_on_ctrlc = node.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
            shutdown_on_ctrlc.send();
        }
    });

    node.server_fut.await;
    node.sweep_task
        .await
        .context("sweep task panicked")?;
    Ok(())
}
