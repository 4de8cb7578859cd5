//! Graph endpoints: assembly, watermarks and graph lifecycle.

use axum::extract::{Json, State};
use axum::http::StatusCode;

use svcgraph_service::graph::GraphService;
use svcgraph_service::types::{Graph, GraphSummary, NewGraph, NextIds};

use crate::error::{ApiError, ApiJson, ApiPath, ErrorBody};
use crate::state::AppState;
use crate::types::DeleteResponse;

/// Get a graph with all its services and relations.
///
/// `services` and `relations` are always arrays, empty when the graph has none.
#[utoipa::path(
    get,
    path = "/api/v1/graph/{id}",
    params(
        ("id" = i64, Path, description = "Graph id"),
    ),
    responses(
        (status = 200, description = "Assembled graph document", body = Graph),
        (status = 404, description = "Graph not found", body = ErrorBody),
        (status = 500, description = "Storage failure", body = ErrorBody),
    ),
    tag = "Graph"
)]
pub async fn get_graph(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Graph>, ApiError> {
    let graph = GraphService::assemble(state.pool(), state.metrics(), id).await?;
    Ok(Json(graph))
}

/// Get the next free node and edge ids of a graph.
#[utoipa::path(
    get,
    path = "/api/v1/graph/{id}/next-ids",
    params(
        ("id" = i64, Path, description = "Graph id"),
    ),
    responses(
        (status = 200, description = "Current watermarks", body = NextIds),
        (status = 404, description = "Graph not found", body = ErrorBody),
    ),
    tag = "Graph"
)]
pub async fn next_ids(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<NextIds>, ApiError> {
    let ids = GraphService::next_ids(state.pool(), state.metrics(), id).await?;
    Ok(Json(ids))
}

/// List all graphs with child counts.
#[utoipa::path(
    get,
    path = "/api/v1/graphs",
    responses(
        (status = 200, description = "Graph summaries ordered by id", body = Vec<GraphSummary>),
    ),
    tag = "Graph"
)]
pub async fn list_graphs(
    State(state): State<AppState>,
) -> Result<Json<Vec<GraphSummary>>, ApiError> {
    let graphs = GraphService::list(state.pool(), state.metrics()).await?;
    Ok(Json(graphs))
}

/// Create an empty graph.
///
/// The id is optional; the store allocates one when it is omitted.
#[utoipa::path(
    post,
    path = "/api/v1/graphs",
    request_body = NewGraph,
    responses(
        (status = 201, description = "Graph created", body = Graph),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 409, description = "Graph id already taken", body = ErrorBody),
    ),
    tag = "Graph"
)]
pub async fn create_graph(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<NewGraph>,
) -> Result<(StatusCode, Json<Graph>), ApiError> {
    let graph = GraphService::create(state.pool(), state.metrics(), req).await?;
    Ok((StatusCode::CREATED, Json(graph)))
}

/// Delete a graph and everything in it.
#[utoipa::path(
    delete,
    path = "/api/v1/graph/{id}",
    params(
        ("id" = i64, Path, description = "Graph id"),
    ),
    responses(
        (status = 200, description = "Graph deleted", body = DeleteResponse),
        (status = 404, description = "Graph not found", body = ErrorBody),
    ),
    tag = "Graph"
)]
pub async fn delete_graph(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    GraphService::delete(state.pool(), state.metrics(), id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
