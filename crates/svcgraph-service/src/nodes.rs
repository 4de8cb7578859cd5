//! Service (node) operations.
//!
//! Creation is the only write that touches the owning graph: the row insert
//! and the `max_node_id` advance commit together or not at all.

use sqlx::SqlitePool;

use crate::error::ServiceError;
use crate::graph::graph_not_found;
use crate::metrics::{Metrics, Operation};
use crate::store;
use crate::types::{EntityKind, NewService, Service, ServicePatch};
use crate::watermark::{self, Counter};

/// Stateless service operations.
pub struct NodeService;

impl NodeService {
    /// Inserts a service and advances its graph's `max_node_id` to at least
    /// `id + 1`.
    ///
    /// Duplicate `(graph_id, id)` is a [`ServiceError::Conflict`]; an unknown
    /// graph is [`ServiceError::NotFound`].
    pub async fn create(
        pool: &SqlitePool,
        metrics: &Metrics,
        svc: NewService,
    ) -> Result<Service, ServiceError> {
        let result = create_service(pool, svc).await;
        if matches!(result, Err(ServiceError::Watermark(_))) {
            metrics.record_watermark_failure();
        }
        metrics.observe(EntityKind::Service, Operation::Create, result)
    }

    /// Fetches service `id`, optionally restricted to `graph_id`.
    pub async fn get(
        pool: &SqlitePool,
        metrics: &Metrics,
        id: i64,
        graph_id: Option<i64>,
    ) -> Result<Service, ServiceError> {
        let result = get_service(pool, id, graph_id).await;
        metrics.observe(EntityKind::Service, Operation::Read, result)
    }

    /// Applies a partial update and returns the stored result. Watermarks
    /// are not touched.
    pub async fn update(
        pool: &SqlitePool,
        metrics: &Metrics,
        id: i64,
        graph_id: Option<i64>,
        patch: ServicePatch,
    ) -> Result<Service, ServiceError> {
        let result = update_service(pool, id, graph_id, patch).await;
        metrics.observe(EntityKind::Service, Operation::Update, result)
    }

    /// Deletes service `id`. Returns whether a row was removed; watermarks
    /// are not lowered.
    pub async fn delete(
        pool: &SqlitePool,
        metrics: &Metrics,
        id: i64,
        graph_id: Option<i64>,
    ) -> Result<bool, ServiceError> {
        let result = delete_service(pool, id, graph_id).await;
        metrics.observe(EntityKind::Service, Operation::Delete, result)
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("service {id} not found"))
}

async fn create_service(pool: &SqlitePool, svc: NewService) -> Result<Service, ServiceError> {
    svc.validate()?;

    let mut tx = pool.begin().await?;

    store::insert_service(&mut tx, &svc)
        .await
        .map_err(|e| match e {
            ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                "service {} already exists in graph {}",
                svc.id, svc.graph_id
            )),
            ServiceError::NotFound(_) => graph_not_found(svc.graph_id),
            other => other,
        })?;
    watermark::advance(&mut tx, svc.graph_id, Counter::Node, svc.id).await?;

    tx.commit().await?;

    tracing::debug!(graph_id = svc.graph_id, id = svc.id, "service created");
    Ok(Service {
        id: svc.id,
        graph_id: svc.graph_id,
        name: svc.name,
        description: svc.description,
        x: svc.x,
        y: svc.y,
    })
}

async fn get_service(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
) -> Result<Service, ServiceError> {
    let mut conn = pool.acquire().await?;
    let graph_id = store::resolve_graph(&mut conn, EntityKind::Service, id, scope)
        .await?
        .ok_or_else(|| not_found(id))?;
    store::fetch_service(&mut conn, graph_id, id)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn update_service(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
    patch: ServicePatch,
) -> Result<Service, ServiceError> {
    patch.validate()?;

    let mut conn = pool.acquire().await?;
    match store::update_service(&mut conn, id, scope, &patch).await? {
        Some(updated) => {
            tracing::debug!(graph_id = updated.graph_id, id, "service updated");
            Ok(updated)
        }
        None => {
            // Nothing matched: report an ambiguous id rather than a missing one.
            store::resolve_graph(&mut conn, EntityKind::Service, id, scope).await?;
            Err(not_found(id))
        }
    }
}

async fn delete_service(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
) -> Result<bool, ServiceError> {
    let mut conn = pool.acquire().await?;
    match store::delete_service(&mut conn, id, scope).await? {
        Some(graph_id) => {
            tracing::debug!(graph_id, id, "service deleted");
            Ok(true)
        }
        None => {
            store::resolve_graph(&mut conn, EntityKind::Service, id, scope).await?;
            Ok(false)
        }
    }
}
