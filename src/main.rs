//! The loomflow server binary.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::Level;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use loomflow::component::ComponentRegistry;
use loomflow::config::RuntimeConfig;
use loomflow::flows::MemoryFlowStore;
use loomflow::runs::FlowRunner;
use loomflow::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .init();

    let config = RuntimeConfig::default();
    let addr = config.bind_addr;

    let runner = Arc::new(FlowRunner::new(
        Arc::new(ComponentRegistry::with_builtins()),
        config,
    ));
    let flows = Arc::new(MemoryFlowStore::new());
    let app = router(AppState::new(runner, flows));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("loomflow listening on http://{addr}");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
    tracing::info!("shutting down");
}
