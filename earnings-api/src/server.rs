//! Server assembly (§2a, A2; §6a). A simplified version of the teacher's
//! `lexe-api::server::build_server_fut`: the same middleware stack (body
//! limit, load shedding, concurrency limit, handling timeout, graceful
//! shutdown) but without TLS, since this service sits behind a terminating
//! proxy rather than speaking TLS itself.

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use common::shutdown::ShutdownChannel;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Tower/axum middleware knobs, mirroring the teacher's `LayerConfig`
/// defaults in spirit, tuned down for this service's expected request
/// sizes and volumes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LayerConfig {
    pub body_limit: usize,
    pub concurrency: usize,
    pub handling_timeout: Duration,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            // Payment-proof image uploads need headroom; see §6a (5 MiB cap).
            body_limit: 8 * 1024 * 1024,
            concurrency: 1024,
            handling_timeout: Duration::from_secs(15),
        }
    }
}

/// Builds the server future for `router`, bound to `bind_addr`, wired to
/// gracefully shut down when `shutdown` fires. Returns the future and the
/// resolved `http://` URL so callers can log it.
pub fn build_server_fut(
    bind_addr: SocketAddr,
    router: Router<()>,
    layer_config: LayerConfig,
    mut shutdown: ShutdownChannel,
) -> anyhow::Result<(impl std::future::Future<Output = ()>, String)> {
    let listener = TcpListener::bind(bind_addr).context("could not bind TCP listener")?;
    listener
        .set_nonblocking(true)
        .context("could not set listener non-blocking")?;
    let server_addr = listener
        .local_addr()
        .context("could not get local address of listener")?;
    let server_url = format!("http://{server_addr}");
    info!(%server_url, "binding earnings API server");

    let router = router
        .fallback(crate::error::not_found_fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::extract::DefaultBodyLimit::max(layer_config.body_limit))
                // Handles errors from the load-shed/concurrency layers below
                // (backpressure signaled as Poll::Pending/an error, not a
                // normal response).
                .layer(axum::error_handling::HandleErrorLayer::new(
                    |_: tower::BoxError| async move {
                        (
                            http::StatusCode::SERVICE_UNAVAILABLE,
                            "service is at capacity; retry later",
                        )
                    },
                ))
                .layer(tower::load_shed::LoadShedLayer::new())
                .layer(tower::limit::ConcurrencyLimitLayer::new(layer_config.concurrency))
                .layer(TimeoutLayer::new(layer_config.handling_timeout)),
        );

    let listener = tokio::net::TcpListener::from_std(listener)
        .context("could not convert to tokio TcpListener")?;

    let fut = async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "earnings API server exited with an error");
        }
    };

    Ok((fut, server_url))
}
