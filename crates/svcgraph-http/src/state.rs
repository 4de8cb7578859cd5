//! HTTP application state: wraps `ServiceState` with HTTP-specific fields.
//!
//! `AppState` derefs to `ServiceState`, so handlers reach the pool and
//! metrics directly.

use std::ops::Deref;
use std::sync::Arc;

use svcgraph_service::ServiceState;
use svcgraph_service::error::ServiceError;

/// Shared HTTP application state, cloneable across handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    service: ServiceState,
    cors_origins: Vec<String>,
}

impl Deref for AppState {
    type Target = ServiceState;

    fn deref(&self) -> &ServiceState {
        &self.inner.service
    }
}

impl AppState {
    /// Creates a new HTTP application state.
    pub fn new(service: ServiceState, cors_origins: Vec<String>) -> Self {
        Self {
            inner: Arc::new(AppInner {
                service,
                cors_origins,
            }),
        }
    }

    /// Creates an in-memory application state (for tests and ephemeral use).
    pub async fn new_in_memory() -> Result<Self, ServiceError> {
        Ok(Self::new(ServiceState::new_in_memory().await?, vec![]))
    }

    /// Returns the configured CORS allowed origins.
    pub fn cors_origins(&self) -> &[String] {
        &self.inner.cors_origins
    }
}
