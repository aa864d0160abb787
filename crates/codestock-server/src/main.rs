use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod routes;
mod state;

use codestock_storage::snippets::SnippetGateway;
use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // A missing .env file is normal in deployed environments.
    dotenvy::dotenv().ok();

    // Structured JSON logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let ServerConfig {
        bind,
        store,
        lambda,
    } = ServerConfig::from_env()?;

    let gateway = match store {
        Ok(store) => {
            tracing::info!(
                store = %store.base_url,
                table = %store.table,
                timeout_secs = store.timeout.as_secs(),
                "snippet store configured"
            );
            Some(SnippetGateway::connect(store)?)
        }
        Err(e) => {
            tracing::error!("snippet store not configured, snippet routes will fail: {e}");
            None
        }
    };

    let app = routes::router(AppState::new(gateway));

    if lambda {
        return lambda_http::run(app).await.map_err(|e| eyre::eyre!(e));
    }

    serve(app, bind).await
}

async fn serve(app: Router, bind: SocketAddr) -> eyre::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(addr = %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
