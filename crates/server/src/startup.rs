use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::{AppConfig, StorageBackend};
use migration::MigratorTrait;
use models::schema::ClientSchema;
use service::client::{repo::{InMemoryClientRepository, SeaOrmClientRepository}, ClientRepository};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, ClientResource};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Open the configured storage backend; postgres is migrated before use.
pub async fn build_repository(cfg: &AppConfig) -> Result<Arc<dyn ClientRepository>, StartupError> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            warn!(event = "storage_memory", "using in-memory storage; clients are lost on restart");
            Ok(Arc::new(InMemoryClientRepository::new()))
        }
        StorageBackend::Postgres => {
            let db = models::db::connect_with_config(&cfg.database)
                .await
                .map_err(|e| StartupError::Storage(e.to_string()))?;
            migration::Migrator::up(&db, None)
                .await
                .map_err(|e| StartupError::Storage(format!("migrate up: {e}")))?;
            info!(event = "storage_postgres", "database migrated");
            Ok(Arc::new(SeaOrmClientRepository::new(db)))
        }
    }
}

/// Schema, storage and resource, wired for the given config.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let schema = ClientSchema::from_config(&cfg.clients).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    info!(event = "client_schema", fields = schema.rules().len(), "client schema loaded");
    let repo = build_repository(cfg).await?;
    let resource = ClientResource::with_repository(repo, schema);
    Ok(routes::build_router(resource, build_cors()))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Build the app for `cfg` and serve it until Ctrl+C.
pub async fn run_with_config(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr = bind_addr(&cfg)?;
    info!(%addr, backend = ?cfg.storage.backend, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
