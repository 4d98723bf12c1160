//! libris server binary.
//!
//! Wires the stores, cache, services and gateway together and serves HTTP.
//!
//! ```bash
//! # With a config file
//! libris --config config.yaml
//!
//! # Environment only
//! LIBRIS_SERVER__PORT=9090 libris
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::info;

use libris_api::http::create_router;
use libris_api::middleware::RateLimiter;
use libris_api::observability::init_tracing;
use libris_api::AppState;
use libris_domain::cache::{
    AvailableBookIndex, CacheBackend, EntityCache, MemoryCacheBackend,
};
use libris_server::service::{BookService, BorrowService, CollectionService};
use libris_server::ServerConfig;
use libris_storage::{
    MemoryBookStore, MemoryBorrowStore, MemoryCollectionStore, RedisCacheBackend,
};

/// libris — library management backend.
#[derive(Parser, Debug)]
#[command(name = "libris")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_tracing(&config.logging.level, config.logging.json);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting libris server");

    // Cache backend per configuration; everything behind it is a hint.
    let backend: Arc<dyn CacheBackend> = match config.cache.backend.as_str() {
        "redis" => {
            let addr = config
                .cache
                .redis_addr
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("cache.redis_addr is required for redis"))?;
            info!(%addr, "Using Redis cache backend");
            Arc::new(RedisCacheBackend::new(
                addr,
                config.cache.redis_password.as_deref(),
            )?)
        }
        _ => {
            info!("Using in-memory cache backend");
            Arc::new(MemoryCacheBackend::new())
        }
    };
    let ttl = Duration::from_secs(config.cache.ttl_secs);
    let cache = EntityCache::with_ttl(backend.clone(), ttl);
    let index = AvailableBookIndex::with_ttl(backend, ttl);

    // Authoritative stores. Only the in-memory backend is built in; see
    // storage.backend validation.
    let collection_store = Arc::new(MemoryCollectionStore::new());
    let book_store = Arc::new(MemoryBookStore::new());
    let borrow_store = Arc::new(MemoryBorrowStore::new());

    // Services, wired outermost-in: the collection/book client cycle is
    // broken by binding the book client after both services exist.
    let collections = Arc::new(CollectionService::new(collection_store, cache.clone()));
    let books = Arc::new(BookService::new(
        book_store,
        cache,
        index.clone(),
        collections.clone(),
    ));
    collections.bind_books(books.clone());
    let borrows = Arc::new(BorrowService::new(
        borrow_store,
        collections.clone(),
        books.clone(),
        index,
    ));

    let state = AppState::new(
        collections,
        books,
        borrows,
        Duration::from_millis(config.gateway.batch_window_ms),
    );
    let limiter = Arc::new(RateLimiter::new(
        config.gateway.rate_limit,
        Duration::from_secs(config.gateway.rate_limit_window_secs),
    ));
    let router = create_router(state, limiter);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
