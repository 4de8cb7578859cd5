//! Transport-agnostic types shared across the service layer.
//!
//! Entity ids are caller-supplied `i64` values, unique within one graph.
//! No HTTP dependencies.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// The assembled graph document: scalar graph fields plus every service and
/// relation whose `graph_id` matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Graph {
    pub id: i64,
    pub name: String,
    /// Smallest node id guaranteed to be above every service id ever created.
    pub max_node_id: i64,
    /// Smallest edge id guaranteed to be above every relation id ever created.
    pub max_edge_id: i64,
    /// Always present; empty when the graph has no services.
    pub services: Vec<Service>,
    /// Always present; empty when the graph has no relations.
    pub relations: Vec<Relation>,
}

/// Graph row without its children, plus child counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GraphSummary {
    pub id: i64,
    pub name: String,
    pub max_node_id: i64,
    pub max_edge_id: i64,
    pub service_count: i64,
    pub relation_count: i64,
}

/// The ids a client can safely use for its next service and relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NextIds {
    pub graph_id: i64,
    pub next_node_id: i64,
    pub next_edge_id: i64,
}

/// A node in a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Service {
    pub id: i64,
    pub graph_id: i64,
    pub name: String,
    pub description: String,
    /// Layout coordinate, no semantic meaning.
    pub x: f64,
    /// Layout coordinate, no semantic meaning.
    pub y: f64,
}

/// A directed edge between two service ids.
///
/// Endpoints are not checked against existing services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Relation {
    pub id: i64,
    pub graph_id: i64,
    pub name: String,
    pub description: String,
    pub from_service: i64,
    pub to_service: i64,
}

/// Request to create a graph.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewGraph {
    /// Explicit graph id. Allocated by the store when omitted.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Request to create a service. The id is required.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewService {
    pub id: i64,
    pub graph_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Request to create a relation. The id is required.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewRelation {
    pub id: i64,
    pub graph_id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub from_service: i64,
    pub to_service: i64,
}

/// Partial service update. Absent fields keep their stored value; `id` and
/// `graph_id` are not updatable and are ignored if sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ServicePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

/// Partial relation update.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RelationPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub from_service: Option<i64>,
    #[serde(default)]
    pub to_service: Option<i64>,
}

/// Kind of entity, used for messages and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Graph,
    Service,
    Relation,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Service => "service",
            Self::Relation => "relation",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks that `id` is usable as an entity id: non-negative, and small
/// enough that `id + 1` still fits in an `i64`.
pub fn validate_id(kind: EntityKind, field: &str, id: i64) -> Result<(), ServiceError> {
    if id < 0 {
        return Err(ServiceError::BadRequest(format!(
            "{kind} {field} must be non-negative, got {id}"
        )));
    }
    if id == i64::MAX {
        return Err(ServiceError::BadRequest(format!(
            "{kind} {field} {id} leaves no room for a successor id"
        )));
    }
    Ok(())
}

/// Rejects blank names.
pub fn validate_name(kind: EntityKind, name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::BadRequest(format!(
            "{kind} name must not be empty"
        )));
    }
    Ok(())
}

fn validate_coordinate(kind: EntityKind, axis: &str, value: f64) -> Result<(), ServiceError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ServiceError::BadRequest(format!(
            "{kind} {axis} coordinate must be finite"
        )))
    }
}

impl NewGraph {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(id) = self.id {
            validate_id(EntityKind::Graph, "id", id)?;
        }
        validate_name(EntityKind::Graph, &self.name)
    }
}

impl NewService {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_id(EntityKind::Service, "id", self.id)?;
        validate_id(EntityKind::Service, "graph_id", self.graph_id)?;
        validate_name(EntityKind::Service, &self.name)?;
        validate_coordinate(EntityKind::Service, "x", self.x)?;
        validate_coordinate(EntityKind::Service, "y", self.y)
    }
}

impl NewRelation {
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_id(EntityKind::Relation, "id", self.id)?;
        validate_id(EntityKind::Relation, "graph_id", self.graph_id)?;
        validate_name(EntityKind::Relation, &self.name)
    }
}

impl ServicePatch {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            validate_name(EntityKind::Service, name)?;
        }
        if let Some(x) = self.x {
            validate_coordinate(EntityKind::Service, "x", x)?;
        }
        if let Some(y) = self.y {
            validate_coordinate(EntityKind::Service, "y", y)?;
        }
        Ok(())
    }
}

impl RelationPatch {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            validate_name(EntityKind::Relation, name)?;
        }
        Ok(())
    }
}
