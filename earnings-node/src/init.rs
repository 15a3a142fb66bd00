//! Wires the storage, promo config, event bus, HTTP router, and background
//! sweep together into a single running node (A6).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use common::shutdown::ShutdownChannel;
use common::task::LxTask;
use earnings_api::blob_store::InMemoryBlobStore;
use earnings_api::server::{self, LayerConfig};
use earnings_api::state::AppState;
use tracing::info;

use crate::cli::NodeArgs;
use crate::config;
use crate::sweep;

/// Everything [`main`](crate::main) needs to run the node until shutdown.
pub struct Node {
    pub server_fut: Pin<Box<dyn Future<Output = ()> + Send>>,
    pub server_url: String,
    pub sweep_task: LxTask<()>,
    pub shutdown: ShutdownChannel,
}

/// Builds the node's state and tasks. Does not start serving; the caller
/// drives `node.server_fut` (typically alongside a Ctrl+C handler) to run
/// it, and sends on `node.shutdown` to stop both the server and the sweep.
pub fn init(args: NodeArgs) -> anyhow::Result<Node> {
    let settings = config::settings_from_env()?;
    info!(?settings, "loaded settings");

    let app_state = Arc::new(AppState::new(
        settings,
        Box::new(InMemoryBlobStore::default()),
    ));

    let shutdown = ShutdownChannel::new();

    let router = earnings_api::routes::router(app_state.clone());
    let (server_fut, server_url) = server::build_server_fut(
        args.listen_addr(),
        router,
        LayerConfig::default(),
        shutdown.clone(),
    )?;

    let sweep_task = sweep::spawn(app_state, shutdown.clone());

    Ok(Node {
        server_fut: Box::pin(server_fut),
        server_url,
        sweep_task,
        shutdown,
    })
}
