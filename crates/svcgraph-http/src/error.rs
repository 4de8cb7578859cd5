//! HTTP error type and JSON error bodies.
//!
//! Every failure leaves the server as `{"error": <code>, "detail": <text>}`
//! with a status derived from the service-layer error kind. Extractor
//! rejections go through the same path, so a malformed body is a 400 with a
//! JSON body rather than axum's plain-text 422.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use svcgraph_service::error::ServiceError;

/// API error returned by every handler.
///
/// Carries the service-layer error; extractor rejections become
/// [`ServiceError::BadRequest`].
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] ServiceError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::Ambiguous(_) => StatusCode::CONFLICT,
            ServiceError::Watermark(_) | ServiceError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::BadRequest(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(ServiceError::BadRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ServiceError::BadRequest(rejection.body_text()))
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error code (e.g. "bad_request", "not_found", "conflict", "storage_error").
    pub(crate) error: String,
    /// Human-readable error detail, if available.
    pub(crate) detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.0.code();
        let detail = self.to_string();

        if self.0.is_server_error() {
            tracing::error!(code = error, %detail, "request failed");
        } else {
            tracing::debug!(code = error, %detail, "request rejected");
        }

        let body = ErrorBody {
            error: error.to_owned(),
            detail: Some(detail),
        };
        (status, axum::Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Extractors with JSON rejections
// ---------------------------------------------------------------------------

/// `axum::Json` whose rejection is a 400 [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` whose rejection is a 400 [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// `axum::extract::Query` whose rejection is a 400 [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
