//! Per-graph id watermarks.
//!
//! `max_node_id` and `max_edge_id` are high-water marks: after a service with
//! id `n` is created, `max_node_id >= n + 1` (relations likewise for
//! `max_edge_id`). They only ever move forward. Deleting or updating entities
//! leaves them untouched, and nothing recomputes them from the tables.
//!
//! The advance is one conditional `UPDATE` evaluated by the store, so two
//! concurrent creations in the same graph converge on the larger value
//! whatever order they commit in.

use sqlx::SqliteConnection;

use crate::error::ServiceError;
use crate::types::NextIds;

/// Which watermark of a graph to advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// `max_node_id`, advanced by service creation.
    Node,
    /// `max_edge_id`, advanced by relation creation.
    Edge,
}

impl Counter {
    fn column(self) -> &'static str {
        match self {
            Self::Node => "max_node_id",
            Self::Edge => "max_edge_id",
        }
    }
}

/// The watermark value implied by an entity id.
pub fn successor(id: i64) -> Result<i64, ServiceError> {
    id.checked_add(1)
        .ok_or_else(|| ServiceError::BadRequest(format!("id {id} has no successor")))
}

/// Raises `counter` of `graph_id` to at least `id + 1`.
///
/// Failures surface as [`ServiceError::Watermark`] so callers can tell a
/// stale watermark apart from a failed insert.
pub(crate) async fn advance(
    conn: &mut SqliteConnection,
    graph_id: i64,
    counter: Counter,
    id: i64,
) -> Result<(), ServiceError> {
    let floor = successor(id)?;
    let column = counter.column();
    let sql = format!("UPDATE graphs SET {column} = MAX({column}, ?) WHERE id = ?");

    let result = sqlx::query(&sql)
        .bind(floor)
        .bind(graph_id)
        .execute(conn)
        .await
        .map_err(|e| ServiceError::Watermark(e.to_string()))?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::Watermark(format!(
            "graph {graph_id} vanished before {column} could be advanced"
        )));
    }

    tracing::trace!(graph_id, column, floor, "watermark advanced");
    Ok(())
}

/// Reads both watermarks of a graph.
pub(crate) async fn current(
    conn: &mut SqliteConnection,
    graph_id: i64,
) -> Result<Option<NextIds>, ServiceError> {
    let row = sqlx::query_as::<_, (i64, i64)>(
        "SELECT max_node_id, max_edge_id FROM graphs WHERE id = ?",
    )
    .bind(graph_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(|(next_node_id, next_edge_id)| NextIds {
        graph_id,
        next_node_id,
        next_edge_id,
    }))
}
