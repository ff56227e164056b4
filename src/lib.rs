pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    config::{Config, StorageBackend},
    db::{Cache, CatalogStore, MemorySeed, MemoryStore, MongoStore},
    routes::{create_router, AppState},
    services::{AzureSasSigner, HttpEmbeddingProvider, JwksVerifier},
};

pub use error::{AppError, AppResult};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_handle) = Cache::new(redis_client);

    let mut mongo_client = None;
    let store: Arc<dyn CatalogStore> = match config.storage {
        StorageBackend::Mongo => {
            let (client, database) =
                db::mongo::connect(&config.mongo_uri, &config.mongo_database).await?;
            let store = MongoStore::new(&database, config.vector_index.as_str());
            store
                .ensure_indexes()
                .await
                .context("Failed to create indexes")?;
            mongo_client = Some(client);
            Arc::new(store)
        }
        StorageBackend::Memory => {
            let seed = match &config.seed_path {
                Some(path) => MemorySeed::from_file(path)
                    .with_context(|| format!("Failed to load seed from {}", path))?,
                None => MemorySeed::default(),
            };
            tracing::info!(movies = seed.movies.len(), "Using in-memory store");
            Arc::new(MemoryStore::from_seed(seed))
        }
    };

    let signer = AzureSasSigner::from_connection_string(
        &config.azure_storage_connection_string,
        config.blob_container.as_str(),
        config.signed_url_ttl_minutes,
    )?;
    let verifier = JwksVerifier::new(
        cache.clone(),
        config.jwks_url(),
        config.auth_issuer.clone(),
        config.auth_audience.clone(),
        config.jwks_cache_ttl_secs,
    );
    let embedder = HttpEmbeddingProvider::new(
        cache,
        config.embedding_api_url.clone(),
        config.embedding_cache_ttl_secs,
    );

    let state = Arc::new(AppState {
        store,
        signer: Arc::new(signer),
        verifier: Arc::new(verifier),
        embedder: Arc::new(embedder),
    });
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache_handle.shutdown().await;
    if let Some(client) = mongo_client {
        client.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}
