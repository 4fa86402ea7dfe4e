use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use configs::{AppConfig, ServerConfig, StoreBackend, StoreConfig};
use service::{DocumentStore, FirebaseStore, LocalStore};
use tracing::{info, warn};

use crate::{errors::StartupError, routes, state::AppState};

/// Construct the configured store backend.
pub async fn build_store(cfg: &StoreConfig) -> Result<Arc<dyn DocumentStore>, StartupError> {
    let store: Arc<dyn DocumentStore> = match cfg.backend {
        StoreBackend::Firebase => {
            let store = FirebaseStore::connect(
                &cfg.url,
                &cfg.credentials_path,
                cfg.auth_token.as_deref(),
                Duration::from_secs(cfg.request_timeout_secs),
            )
            .await?;
            info!(url = %cfg.url, "firebase store ready");
            Arc::new(store)
        }
        StoreBackend::Local => match cfg.data_file.as_deref() {
            Some(path) => {
                let store = LocalStore::open(path).await?;
                info!(%path, "local store ready");
                store
            }
            None => {
                warn!("local store without data_file; records are lost on exit");
                LocalStore::in_memory()
            }
        },
    };
    Ok(store)
}

/// Resolve host/port from config
fn bind_addr(cfg: &ServerConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address {}:{}: {e}", cfg.host, cfg.port)))
}

/// Serve the API for an already loaded config until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let store = build_store(&cfg.store).await?;
    let app: Router = routes::build_router(AppState::new(store));

    let addr = bind_addr(&cfg.server)?;
    info!(%addr, backend = ?cfg.store.backend, "starting registry api");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
