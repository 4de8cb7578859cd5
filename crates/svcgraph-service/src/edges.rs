//! Relation (edge) operations.
//!
//! Mirrors [`crate::nodes`] with `max_edge_id` as the watermark. Endpoints
//! are stored as given: a relation may point at service ids that do not
//! exist, or that live in another graph.

use sqlx::SqlitePool;

use crate::error::ServiceError;
use crate::graph::graph_not_found;
use crate::metrics::{Metrics, Operation};
use crate::store;
use crate::types::{EntityKind, NewRelation, Relation, RelationPatch};
use crate::watermark::{self, Counter};

/// Stateless relation operations.
pub struct EdgeService;

impl EdgeService {
    /// Inserts a relation and advances its graph's `max_edge_id` to at least
    /// `id + 1`.
    pub async fn create(
        pool: &SqlitePool,
        metrics: &Metrics,
        rel: NewRelation,
    ) -> Result<Relation, ServiceError> {
        let result = create_relation(pool, rel).await;
        if matches!(result, Err(ServiceError::Watermark(_))) {
            metrics.record_watermark_failure();
        }
        metrics.observe(EntityKind::Relation, Operation::Create, result)
    }

    /// Fetches relation `id`, optionally restricted to `graph_id`.
    pub async fn get(
        pool: &SqlitePool,
        metrics: &Metrics,
        id: i64,
        graph_id: Option<i64>,
    ) -> Result<Relation, ServiceError> {
        let result = get_relation(pool, id, graph_id).await;
        metrics.observe(EntityKind::Relation, Operation::Read, result)
    }

    /// Applies a partial update and returns the stored result.
    pub async fn update(
        pool: &SqlitePool,
        metrics: &Metrics,
        id: i64,
        graph_id: Option<i64>,
        patch: RelationPatch,
    ) -> Result<Relation, ServiceError> {
        let result = update_relation(pool, id, graph_id, patch).await;
        metrics.observe(EntityKind::Relation, Operation::Update, result)
    }

    /// Deletes relation `id`. Returns whether a row was removed.
    pub async fn delete(
        pool: &SqlitePool,
        metrics: &Metrics,
        id: i64,
        graph_id: Option<i64>,
    ) -> Result<bool, ServiceError> {
        let result = delete_relation(pool, id, graph_id).await;
        metrics.observe(EntityKind::Relation, Operation::Delete, result)
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("relation {id} not found"))
}

async fn create_relation(pool: &SqlitePool, rel: NewRelation) -> Result<Relation, ServiceError> {
    rel.validate()?;

    let mut tx = pool.begin().await?;

    store::insert_relation(&mut tx, &rel)
        .await
        .map_err(|e| match e {
            ServiceError::Conflict(_) => ServiceError::Conflict(format!(
                "relation {} already exists in graph {}",
                rel.id, rel.graph_id
            )),
            ServiceError::NotFound(_) => graph_not_found(rel.graph_id),
            other => other,
        })?;
    watermark::advance(&mut tx, rel.graph_id, Counter::Edge, rel.id).await?;

    tx.commit().await?;

    tracing::debug!(
        graph_id = rel.graph_id,
        id = rel.id,
        from = rel.from_service,
        to = rel.to_service,
        "relation created"
    );
    Ok(Relation {
        id: rel.id,
        graph_id: rel.graph_id,
        name: rel.name,
        description: rel.description,
        from_service: rel.from_service,
        to_service: rel.to_service,
    })
}

async fn get_relation(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
) -> Result<Relation, ServiceError> {
    let mut conn = pool.acquire().await?;
    let graph_id = store::resolve_graph(&mut conn, EntityKind::Relation, id, scope)
        .await?
        .ok_or_else(|| not_found(id))?;
    store::fetch_relation(&mut conn, graph_id, id)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn update_relation(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
    patch: RelationPatch,
) -> Result<Relation, ServiceError> {
    patch.validate()?;

    let mut conn = pool.acquire().await?;
    match store::update_relation(&mut conn, id, scope, &patch).await? {
        Some(updated) => {
            tracing::debug!(graph_id = updated.graph_id, id, "relation updated");
            Ok(updated)
        }
        None => {
            // Nothing matched: report an ambiguous id rather than a missing one.
            store::resolve_graph(&mut conn, EntityKind::Relation, id, scope).await?;
            Err(not_found(id))
        }
    }
}

async fn delete_relation(
    pool: &SqlitePool,
    id: i64,
    scope: Option<i64>,
) -> Result<bool, ServiceError> {
    let mut conn = pool.acquire().await?;
    match store::delete_relation(&mut conn, id, scope).await? {
        Some(graph_id) => {
            tracing::debug!(graph_id, id, "relation deleted");
            Ok(true)
        }
        None => {
            store::resolve_graph(&mut conn, EntityKind::Relation, id, scope).await?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphService;
    use crate::types::NewGraph;
    use crate::{ServiceConfig, ServiceState};

    async fn state_with_graph() -> ServiceState {
        let state = ServiceState::new_in_memory().await.unwrap();
        GraphService::create(
            state.pool(),
            state.metrics(),
            NewGraph {
                id: Some(1),
                name: "g".to_owned(),
            },
        )
        .await
        .unwrap();
        state
    }

    fn relation(id: i64, from: i64, to: i64) -> NewRelation {
        NewRelation {
            id,
            graph_id: 1,
            name: "calls".to_owned(),
            description: String::new(),
            from_service: from,
            to_service: to,
        }
    }

    async fn max_edge_id(state: &ServiceState) -> i64 {
        GraphService::next_ids(state.pool(), state.metrics(), 1)
            .await
            .unwrap()
            .next_edge_id
    }

    #[tokio::test]
    async fn test_create_advances_edge_watermark_only() {
        let state = state_with_graph().await;
        EdgeService::create(state.pool(), state.metrics(), relation(12, 1, 2))
            .await
            .unwrap();
        let ids = GraphService::next_ids(state.pool(), state.metrics(), 1)
            .await
            .unwrap();
        assert_eq!(ids.next_edge_id, 13);
        assert_eq!(ids.next_node_id, 0);
    }

    #[tokio::test]
    async fn test_dangling_endpoints_are_accepted() {
        let state = state_with_graph().await;
        let rel = EdgeService::create(state.pool(), state.metrics(), relation(1, 404, 405))
            .await
            .unwrap();
        assert_eq!(rel.from_service, 404);

        let fetched = EdgeService::get(state.pool(), state.metrics(), 1, Some(1))
            .await
            .unwrap();
        assert_eq!(fetched.to_service, 405);
    }

    #[tokio::test]
    async fn test_duplicate_relation_conflicts() {
        let state = state_with_graph().await;
        EdgeService::create(state.pool(), state.metrics(), relation(1, 1, 2))
            .await
            .unwrap();
        let err = EdgeService::create(state.pool(), state.metrics(), relation(1, 2, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_endpoints() {
        let state = state_with_graph().await;
        EdgeService::create(state.pool(), state.metrics(), relation(1, 1, 2))
            .await
            .unwrap();
        let updated = EdgeService::update(
            state.pool(),
            state.metrics(),
            1,
            None,
            RelationPatch {
                to_service: Some(3),
                description: Some("rerouted".to_owned()),
                ..RelationPatch::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.from_service, 1);
        assert_eq!(updated.to_service, 3);
        assert_eq!(updated.description, "rerouted");
        assert_eq!(updated.name, "calls");
    }

    #[tokio::test]
    async fn test_delete_keeps_watermark() {
        let state = state_with_graph().await;
        EdgeService::create(state.pool(), state.metrics(), relation(6, 1, 2))
            .await
            .unwrap();
        assert!(
            EdgeService::delete(state.pool(), state.metrics(), 6, None)
                .await
                .unwrap()
        );
        assert_eq!(max_edge_id(&state).await, 7);

        let err = EdgeService::get(state.pool(), state.metrics(), 6, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_relation_writes_on_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let state = ServiceState::open(&ServiceConfig {
            database_url: Some(format!("sqlite://{}", dir.path().join("graphs.db").display())),
            max_connections: 8,
        })
        .await
        .unwrap();
        GraphService::create(
            state.pool(),
            state.metrics(),
            NewGraph {
                id: Some(1),
                name: "g".to_owned(),
            },
        )
        .await
        .unwrap();

        let creates: Vec<_> = (0..32)
            .map(|id| {
                let state = state.clone();
                tokio::spawn(async move {
                    EdgeService::create(state.pool(), state.metrics(), relation(id, 0, 1)).await
                })
            })
            .collect();
        for handle in creates {
            handle.await.unwrap().unwrap();
        }

        let writes: Vec<_> = (0..32)
            .map(|id| {
                let state = state.clone();
                tokio::spawn(async move {
                    if id < 16 {
                        let patch = RelationPatch {
                            to_service: Some(id),
                            ..RelationPatch::default()
                        };
                        EdgeService::update(state.pool(), state.metrics(), id, None, patch)
                            .await
                            .map(|_| ())
                    } else {
                        EdgeService::delete(state.pool(), state.metrics(), id, None)
                            .await
                            .map(|removed| assert!(removed))
                    }
                })
            })
            .collect();
        for handle in writes {
            handle.await.unwrap().unwrap();
        }

        let graph = GraphService::assemble(state.pool(), state.metrics(), 1)
            .await
            .unwrap();
        assert_eq!(graph.relations.len(), 16);
        assert!(graph.relations.iter().all(|r| r.to_service == r.id));
        assert_eq!(graph.max_edge_id, 32);
        state.close().await;
    }

    #[tokio::test]
    async fn test_watermark_failure_rolls_back_relation() {
        let state = state_with_graph().await;
        sqlx::query(
            "CREATE TRIGGER block_watermark BEFORE UPDATE OF max_edge_id ON graphs \
             BEGIN SELECT RAISE(ABORT, 'blocked'); END",
        )
        .execute(state.pool())
        .await
        .unwrap();

        let err = EdgeService::create(state.pool(), state.metrics(), relation(2, 1, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Watermark(_)));
        let err = EdgeService::get(state.pool(), state.metrics(), 2, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(max_edge_id(&state).await, 0);
        assert_eq!(state.metrics().watermark_failures_total(), 1);
    }
}
