//! Relation (edge) endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;

use svcgraph_service::edges::EdgeService;
use svcgraph_service::types::{NewRelation, Relation, RelationPatch};

use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ErrorBody};
use crate::state::AppState;
use crate::types::{DeleteResponse, GraphScope};

/// Create a relation.
///
/// Endpoints are not checked against existing services.
#[utoipa::path(
    post,
    path = "/api/v1/relations",
    request_body = NewRelation,
    responses(
        (status = 201, description = "Relation created", body = Relation),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 404, description = "Graph not found", body = ErrorBody),
        (status = 409, description = "Id already used in this graph", body = ErrorBody),
        (status = 500, description = "Storage or watermark failure", body = ErrorBody),
    ),
    tag = "Relation"
)]
pub async fn create_relation(
    State(state): State<AppState>,
    ApiJson(rel): ApiJson<NewRelation>,
) -> Result<(StatusCode, Json<Relation>), ApiError> {
    let created = EdgeService::create(state.pool(), state.metrics(), rel).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/relations/{id}",
    params(
        ("id" = i64, Path, description = "Relation id"),
        GraphScope,
    ),
    responses(
        (status = 200, description = "Relation", body = Relation),
        (status = 404, description = "Relation not found", body = ErrorBody),
        (status = 409, description = "Id exists in several graphs", body = ErrorBody),
    ),
    tag = "Relation"
)]
pub async fn get_relation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<GraphScope>,
) -> Result<Json<Relation>, ApiError> {
    let rel = EdgeService::get(state.pool(), state.metrics(), id, scope.graph_id).await?;
    Ok(Json(rel))
}

#[utoipa::path(
    put,
    path = "/api/v1/relations/{id}",
    params(
        ("id" = i64, Path, description = "Relation id"),
        GraphScope,
    ),
    request_body = RelationPatch,
    responses(
        (status = 200, description = "Updated relation", body = Relation),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 404, description = "Relation not found", body = ErrorBody),
        (status = 409, description = "Id exists in several graphs", body = ErrorBody),
    ),
    tag = "Relation"
)]
pub async fn update_relation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<GraphScope>,
    ApiJson(patch): ApiJson<RelationPatch>,
) -> Result<Json<Relation>, ApiError> {
    let rel =
        EdgeService::update(state.pool(), state.metrics(), id, scope.graph_id, patch).await?;
    Ok(Json(rel))
}

#[utoipa::path(
    delete,
    path = "/api/v1/relations/{id}",
    params(
        ("id" = i64, Path, description = "Relation id"),
        GraphScope,
    ),
    responses(
        (status = 200, description = "Delete outcome", body = DeleteResponse),
        (status = 409, description = "Id exists in several graphs", body = ErrorBody),
    ),
    tag = "Relation"
)]
pub async fn delete_relation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<GraphScope>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = EdgeService::delete(state.pool(), state.metrics(), id, scope.graph_id).await?;
    Ok(Json(DeleteResponse { deleted }))
}
