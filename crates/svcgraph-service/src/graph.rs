//! Graph assembly and graph lifecycle.
//!
//! Assembly turns the flat `graphs`/`services`/`relations` rows of one graph
//! into a single [`Graph`] document. The three reads share one transaction,
//! so the document is a consistent snapshot even while other requests write
//! to the same graph.

use sqlx::SqlitePool;

use crate::error::ServiceError;
use crate::metrics::{Metrics, Operation};
use crate::store::{self, GraphRow};
use crate::types::{EntityKind, Graph, GraphSummary, NewGraph, NextIds, Relation, Service};
use crate::watermark;

/// Stateless graph operations.
pub struct GraphService;

impl GraphService {
    /// Assembles the full document of graph `graph_id`.
    ///
    /// Returns [`ServiceError::NotFound`] when the graph does not exist and
    /// [`ServiceError::Storage`] when the store could not be queried.
    pub async fn assemble(
        pool: &SqlitePool,
        metrics: &Metrics,
        graph_id: i64,
    ) -> Result<Graph, ServiceError> {
        let result = assemble_graph(pool, graph_id).await;
        metrics.observe(EntityKind::Graph, Operation::Read, result)
    }

    /// Current watermarks, i.e. the next ids a client can safely use.
    pub async fn next_ids(
        pool: &SqlitePool,
        metrics: &Metrics,
        graph_id: i64,
    ) -> Result<NextIds, ServiceError> {
        let result = read_next_ids(pool, graph_id).await;
        metrics.observe(EntityKind::Graph, Operation::Read, result)
    }

    /// Lists every graph with its child counts, ordered by id.
    pub async fn list(
        pool: &SqlitePool,
        metrics: &Metrics,
    ) -> Result<Vec<GraphSummary>, ServiceError> {
        let result = list_graphs(pool).await;
        metrics.observe(EntityKind::Graph, Operation::Read, result)
    }

    /// Creates an empty graph with both watermarks at zero.
    pub async fn create(
        pool: &SqlitePool,
        metrics: &Metrics,
        req: NewGraph,
    ) -> Result<Graph, ServiceError> {
        let result = create_graph(pool, req).await;
        metrics.observe(EntityKind::Graph, Operation::Create, result)
    }

    /// Deletes a graph together with its services and relations.
    pub async fn delete(
        pool: &SqlitePool,
        metrics: &Metrics,
        graph_id: i64,
    ) -> Result<(), ServiceError> {
        let result = delete_graph(pool, graph_id).await;
        metrics.observe(EntityKind::Graph, Operation::Delete, result)
    }
}

pub(crate) fn graph_not_found(graph_id: i64) -> ServiceError {
    ServiceError::NotFound(format!("graph {graph_id} not found"))
}

async fn assemble_graph(pool: &SqlitePool, graph_id: i64) -> Result<Graph, ServiceError> {
    let mut tx = pool.begin().await?;

    let row = store::fetch_graph(&mut tx, graph_id)
        .await?
        .ok_or_else(|| graph_not_found(graph_id))?;
    let services = store::fetch_services(&mut tx, graph_id).await?;
    let relations = store::fetch_relations(&mut tx, graph_id).await?;

    tx.commit().await?;

    tracing::debug!(
        graph_id,
        services = services.len(),
        relations = relations.len(),
        "graph assembled"
    );
    Ok(hydrate_graph(row, services, relations))
}

fn hydrate_graph(row: GraphRow, services: Vec<Service>, relations: Vec<Relation>) -> Graph {
    Graph {
        id: row.id,
        name: row.name,
        max_node_id: row.max_node_id,
        max_edge_id: row.max_edge_id,
        services,
        relations,
    }
}

async fn read_next_ids(pool: &SqlitePool, graph_id: i64) -> Result<NextIds, ServiceError> {
    let mut conn = pool.acquire().await?;
    watermark::current(&mut conn, graph_id)
        .await?
        .ok_or_else(|| graph_not_found(graph_id))
}

async fn list_graphs(pool: &SqlitePool) -> Result<Vec<GraphSummary>, ServiceError> {
    let mut conn = pool.acquire().await?;
    store::list_graphs(&mut conn).await
}

async fn delete_graph(pool: &SqlitePool, graph_id: i64) -> Result<(), ServiceError> {
    let mut conn = pool.acquire().await?;
    if store::delete_graph(&mut conn, graph_id).await? == 0 {
        return Err(graph_not_found(graph_id));
    }
    tracing::info!(graph_id, "Graph deleted");
    Ok(())
}

async fn create_graph(pool: &SqlitePool, req: NewGraph) -> Result<Graph, ServiceError> {
    req.validate()?;

    let mut conn = pool.acquire().await?;
    let id = store::insert_graph(&mut conn, req.id, &req.name)
        .await
        .map_err(|e| match (e, req.id) {
            (ServiceError::Conflict(_), Some(id)) => {
                ServiceError::Conflict(format!("graph {id} already exists"))
            }
            (other, _) => other,
        })?;

    tracing::info!(graph_id = id, name = %req.name, "Graph created");
    Ok(Graph {
        id,
        name: req.name,
        max_node_id: 0,
        max_edge_id: 0,
        services: Vec::new(),
        relations: Vec::new(),
    })
}
