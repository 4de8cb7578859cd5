//! Request/response types specific to the HTTP API.
//!
//! Entity payloads (`Graph`, `Service`, `Relation`, ...) come from
//! `svcgraph_service::types`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct PingResponse {
    /// Always "pong".
    pub response: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server status ("ok").
    pub status: String,
    /// Server version.
    pub version: String,
    /// Whether the graph store is file-backed.
    pub persistent: bool,
    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

#[derive(Serialize, ToSchema)]
pub struct DeleteResponse {
    /// Whether a row was removed. Deleting an absent id is not an error.
    pub deleted: bool,
}

/// Optional graph scope for id-keyed service and relation routes.
///
/// Ids are unique only within a graph; pass `graph_id` when the same id is
/// used in more than one graph.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GraphScope {
    /// Graph that owns the entity.
    #[serde(default)]
    pub graph_id: Option<i64>,
}
