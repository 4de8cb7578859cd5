//! Svcgraph Service: core business logic for the service graph server.
//!
//! This crate contains all transport-agnostic logic: the relational schema,
//! graph assembly, per-graph id watermarks, service/relation operations and
//! metrics.
//!
//! The HTTP crate (`svcgraph-http`) depends on this crate and provides the
//! REST adapter.
//!
//! **Zero transport dependencies**: no axum, no HTTP types.

pub mod edges;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod nodes;
pub mod schema;
mod store;
pub mod types;
pub mod watermark;

use std::sync::Arc;
use std::time::Instant;

use sqlx::SqlitePool;

use error::ServiceError;
use metrics::{Metrics, Totals};

/// Configuration subset relevant to the service layer.
///
/// Transport-specific config (host, port, CORS origins) stays in the binary
/// crate's `Config` struct.
pub struct ServiceConfig {
    /// SQLite database URL. `None` keeps everything in memory.
    pub database_url: Option<String>,
    /// Upper bound on pooled store connections.
    pub max_connections: u32,
}

/// Shared service state, cloneable across all transport handlers.
///
/// Owns the store pool; nothing in this crate reaches for a global handle.
#[derive(Clone)]
pub struct ServiceState {
    inner: Arc<Inner>,
}

struct Inner {
    pool: SqlitePool,
    metrics: Metrics,
    persistent: bool,
    start_time: Instant,
}

impl ServiceState {
    /// Opens the store described by `config` and applies migrations.
    pub async fn open(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let pool = schema::open_pool(config.database_url.as_deref(), config.max_connections).await?;
        let persistent = schema::file_url(config.database_url.as_deref()).is_some();
        tracing::info!(
            persistent,
            max_connections = pool.options().get_max_connections(),
            "Graph store opened"
        );
        Ok(Self::from_pool(pool, persistent))
    }

    /// Creates an in-memory service state (for tests and ephemeral use).
    pub async fn new_in_memory() -> Result<Self, ServiceError> {
        let pool = schema::open_pool(None, 1).await?;
        Ok(Self::from_pool(pool, false))
    }

    /// Wraps an already-migrated pool.
    pub fn from_pool(pool: SqlitePool, persistent: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                metrics: Metrics::new(),
                persistent,
                start_time: Instant::now(),
            }),
        }
    }

    // --- Accessors ---

    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn persistent(&self) -> bool {
        self.inner.persistent
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Live row counts for the metrics gauges.
    pub async fn totals(&self) -> Result<Totals, ServiceError> {
        let mut conn = self.inner.pool.acquire().await?;
        let (graphs, services, relations) = store::count_rows(&mut conn).await?;
        Ok(Totals {
            graphs,
            services,
            relations,
        })
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.inner.pool.close().await;
    }
}
