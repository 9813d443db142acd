pub mod api;
pub mod config;
pub mod model;
pub mod query;
pub mod store;

pub use api::routes::create_router;
pub use config::{ConfigError, GatewayConfig};
pub use model::Quad;
pub use query::{QueryError, QueryGateway};
pub use store::{QuadStore, StoreError, StoreHandle};

use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve the API on an already bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    store: StoreHandle,
    timeout: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let gateway = Arc::new(QueryGateway::new(store, timeout));
    let app = create_router(gateway);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("HTTP server failed")
}

/// Open the configured store, serve until Ctrl-C, then close the store.
pub async fn run_server(config: &GatewayConfig) -> anyhow::Result<()> {
    let store = store::open(config).await.context("Cannot open database")?;

    let bind_address = config.listen_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Cannot listen on {}", bind_address))?;
    log::info!("Listening on {}", bind_address);

    let served = serve_on(listener, Arc::clone(&store), config.timeout, shutdown_signal()).await;

    log::info!("Closing {} store", store.backend());
    store.close().await;
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested");
}
