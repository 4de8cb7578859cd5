//! Service (node) endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;

use svcgraph_service::nodes::NodeService;
use svcgraph_service::types::{NewService, Service, ServicePatch};

use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery, ErrorBody};
use crate::state::AppState;
use crate::types::{DeleteResponse, GraphScope};

/// Create a service.
///
/// The caller supplies the id. On success the owning graph's `max_node_id`
/// is at least `id + 1`.
#[utoipa::path(
    post,
    path = "/api/v1/services",
    request_body = NewService,
    responses(
        (status = 201, description = "Service created", body = Service),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 404, description = "Graph not found", body = ErrorBody),
        (status = 409, description = "Id already used in this graph", body = ErrorBody),
        (status = 500, description = "Storage or watermark failure", body = ErrorBody),
    ),
    tag = "Service"
)]
pub async fn create_service(
    State(state): State<AppState>,
    ApiJson(svc): ApiJson<NewService>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    let created = NodeService::create(state.pool(), state.metrics(), svc).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get a service by id.
#[utoipa::path(
    get,
    path = "/api/v1/services/{id}",
    params(
        ("id" = i64, Path, description = "Service id"),
        GraphScope,
    ),
    responses(
        (status = 200, description = "Service", body = Service),
        (status = 404, description = "Service not found", body = ErrorBody),
        (status = 409, description = "Id exists in several graphs", body = ErrorBody),
    ),
    tag = "Service"
)]
pub async fn get_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<GraphScope>,
) -> Result<Json<Service>, ApiError> {
    let svc = NodeService::get(state.pool(), state.metrics(), id, scope.graph_id).await?;
    Ok(Json(svc))
}

/// Update a service.
///
/// Only the fields present in the body change. `id` and `graph_id` are fixed.
#[utoipa::path(
    put,
    path = "/api/v1/services/{id}",
    params(
        ("id" = i64, Path, description = "Service id"),
        GraphScope,
    ),
    request_body = ServicePatch,
    responses(
        (status = 200, description = "Updated service", body = Service),
        (status = 400, description = "Invalid body", body = ErrorBody),
        (status = 404, description = "Service not found", body = ErrorBody),
        (status = 409, description = "Id exists in several graphs", body = ErrorBody),
    ),
    tag = "Service"
)]
pub async fn update_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<GraphScope>,
    ApiJson(patch): ApiJson<ServicePatch>,
) -> Result<Json<Service>, ApiError> {
    let svc = NodeService::update(state.pool(), state.metrics(), id, scope.graph_id, patch).await?;
    Ok(Json(svc))
}

/// Delete a service.
///
/// Deleting an absent id succeeds with `deleted: false`. The graph's
/// `max_node_id` is never lowered.
#[utoipa::path(
    delete,
    path = "/api/v1/services/{id}",
    params(
        ("id" = i64, Path, description = "Service id"),
        GraphScope,
    ),
    responses(
        (status = 200, description = "Delete outcome", body = DeleteResponse),
        (status = 409, description = "Id exists in several graphs", body = ErrorBody),
    ),
    tag = "Service"
)]
pub async fn delete_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(scope): ApiQuery<GraphScope>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = NodeService::delete(state.pool(), state.metrics(), id, scope.graph_id).await?;
    Ok(Json(DeleteResponse { deleted }))
}
