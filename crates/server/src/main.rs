// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TextOps service binary: config, store, orchestrator, one worker, and
//! the dev HTTP API, with cooperative shutdown on ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;
use textops_core::SystemClock;
use textops_engine::{Orchestrator, OutboundSink, StderrSink, StubExecutor, Worker};
use textops_server::{router, AppState, Config, ConfigError, PersistenceProvider};
use textops_storage::{
    ExecutionQueue, PostgresStore, RunRepository, SqliteStore, StorageError,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum BootError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), BootError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("TEXTOPS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("textops.toml"));
    let config = Config::load(&config_path)?;

    match config.persistence.provider {
        PersistenceProvider::Sqlite => {
            let url = config.persistence.connection_string();
            tracing::info!(url = %url, "opening sqlite store");
            let store = Arc::new(SqliteStore::connect(&url).await?);
            serve(store, config).await
        }
        PersistenceProvider::Postgres => {
            let url = config.persistence.connection_string();
            tracing::info!("opening postgres store");
            let store = Arc::new(PostgresStore::connect(&url).await?);
            serve(store, config).await
        }
    }
}

async fn serve<S>(store: Arc<S>, config: Config) -> Result<(), BootError>
where
    S: RunRepository + ExecutionQueue + Send + Sync + 'static,
{
    let orchestrator = Arc::new(Orchestrator::new(store.clone(), SystemClock));
    let worker_config = config.worker_config()?;
    tracing::info!(worker = %worker_config.worker_id, "starting worker");

    let executor = Arc::new(StubExecutor::new(
        orchestrator.clone(),
        worker_config.worker_id.clone(),
    ));
    let sink: Arc<dyn OutboundSink> = Arc::new(StderrSink);
    let worker = Arc::new(Worker::new(store.clone(), executor, sink, worker_config));

    let cancel = CancellationToken::new();
    let polling = {
        let worker = worker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };
    let reclaim = {
        let worker = worker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run_reclaim(cancel).await })
    };

    let state = AppState {
        orchestrator,
        queue: store.clone() as Arc<dyn ExecutionQueue>,
    };
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!(addr = %config.server.bind_addr, "listening");

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received, draining");
            cancel.cancel();
        }
    };
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    cancel.cancel();
    let _ = polling.await;
    let _ = reclaim.await;
    tracing::info!("shutdown complete");
    Ok(())
}
