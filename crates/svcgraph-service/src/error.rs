//! Service-layer error types.
//!
//! `ServiceError` is transport-agnostic. The HTTP crate maps it to status
//! codes and JSON error bodies.

/// Service error shared by every operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input: missing fields, negative ids, empty names.
    #[error("{0}")]
    BadRequest(String),

    /// Graph, service or relation not found.
    #[error("{0}")]
    NotFound(String),

    /// An entity with the same id already exists in the target graph.
    #[error("{0}")]
    Conflict(String),

    /// An unscoped id matched entities in more than one graph.
    #[error("{0}")]
    Ambiguous(String),

    /// The owning graph's watermark could not be advanced. The creation that
    /// triggered it was rolled back.
    #[error("watermark update failed: {0}")]
    Watermark(String),

    /// The store failed (connectivity, constraint, decoding).
    #[error("storage error: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Ambiguous(_) => "ambiguous_id",
            Self::Watermark(_) => "watermark_error",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Whether the failure originates on the server side (5xx class).
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Watermark(_) | Self::Storage(_))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_owned()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_owned())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::NotFound(db.message().to_owned())
            }
            _ => Self::Storage(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for ServiceError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(format!("migration failed: {err}"))
    }
}
