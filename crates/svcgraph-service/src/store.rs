//! Row-level access to the graph tables.
//!
//! Every function takes a `&mut SqliteConnection` so callers decide whether
//! it runs on a pooled connection or inside a transaction. Row structs stay
//! private; callers only see the types in [`crate::types`].

use sqlx::{FromRow, SqliteConnection};

use crate::error::ServiceError;
use crate::types::{
    EntityKind, GraphSummary, NewRelation, NewService, Relation, RelationPatch, Service,
    ServicePatch,
};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct GraphRow {
    pub id: i64,
    pub name: String,
    pub max_node_id: i64,
    pub max_edge_id: i64,
}

#[derive(Debug, Clone, FromRow)]
struct GraphSummaryRow {
    id: i64,
    name: String,
    max_node_id: i64,
    max_edge_id: i64,
    service_count: i64,
    relation_count: i64,
}

#[derive(Debug, Clone, FromRow)]
struct ServiceRow {
    id: i64,
    graph_id: i64,
    name: String,
    description: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, FromRow)]
struct RelationRow {
    id: i64,
    graph_id: i64,
    name: String,
    description: String,
    from_service: i64,
    to_service: i64,
}

impl From<GraphSummaryRow> for GraphSummary {
    fn from(row: GraphSummaryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            max_node_id: row.max_node_id,
            max_edge_id: row.max_edge_id,
            service_count: row.service_count,
            relation_count: row.relation_count,
        }
    }
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            graph_id: row.graph_id,
            name: row.name,
            description: row.description,
            x: row.x,
            y: row.y,
        }
    }
}

impl From<RelationRow> for Relation {
    fn from(row: RelationRow) -> Self {
        Self {
            id: row.id,
            graph_id: row.graph_id,
            name: row.name,
            description: row.description,
            from_service: row.from_service,
            to_service: row.to_service,
        }
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Graph => "graphs",
        EntityKind::Service => "services",
        EntityKind::Relation => "relations",
    }
}

// ---------------------------------------------------------------------------
// Graphs
// ---------------------------------------------------------------------------

/// Inserts a graph with zeroed watermarks and returns its id.
pub(crate) async fn insert_graph(
    conn: &mut SqliteConnection,
    id: Option<i64>,
    name: &str,
) -> Result<i64, ServiceError> {
    let ids: Vec<i64> = sqlx::query_scalar(
        r"
        INSERT INTO graphs (id, name, max_node_id, max_edge_id)
        VALUES (?, ?, 0, 0)
        RETURNING id
        ",
    )
    .bind(id)
    .bind(name)
    .fetch_all(conn)
    .await?;
    ids.into_iter().next().ok_or(ServiceError::Storage(
        "graph insert returned no id".to_owned(),
    ))
}

pub(crate) async fn fetch_graph(
    conn: &mut SqliteConnection,
    graph_id: i64,
) -> Result<Option<GraphRow>, ServiceError> {
    let row = sqlx::query_as::<_, GraphRow>(
        r"
        SELECT id, name, max_node_id, max_edge_id
        FROM graphs
        WHERE id = ?
        ",
    )
    .bind(graph_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub(crate) async fn list_graphs(
    conn: &mut SqliteConnection,
) -> Result<Vec<GraphSummary>, ServiceError> {
    let rows = sqlx::query_as::<_, GraphSummaryRow>(
        r"
        SELECT
            g.id,
            g.name,
            g.max_node_id,
            g.max_edge_id,
            (SELECT COUNT(*) FROM services s WHERE s.graph_id = g.id) AS service_count,
            (SELECT COUNT(*) FROM relations r WHERE r.graph_id = g.id) AS relation_count
        FROM graphs g
        ORDER BY g.id ASC
        ",
    )
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(GraphSummary::from).collect())
}

/// Deletes a graph; its services and relations cascade. Returns rows removed.
pub(crate) async fn delete_graph(
    conn: &mut SqliteConnection,
    graph_id: i64,
) -> Result<u64, ServiceError> {
    let result = sqlx::query("DELETE FROM graphs WHERE id = ?")
        .bind(graph_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Row totals for the three tables, in `(graphs, services, relations)` order.
pub(crate) async fn count_rows(
    conn: &mut SqliteConnection,
) -> Result<(i64, i64, i64), ServiceError> {
    let counts = sqlx::query_as::<_, (i64, i64, i64)>(
        r"
        SELECT
            (SELECT COUNT(*) FROM graphs),
            (SELECT COUNT(*) FROM services),
            (SELECT COUNT(*) FROM relations)
        ",
    )
    .fetch_one(conn)
    .await?;
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Id resolution
// ---------------------------------------------------------------------------

/// Finds the graph holding entity `id`.
///
/// With `scope` set, only that graph is considered. Without it, the id must
/// exist in exactly one graph; several matches are [`ServiceError::Ambiguous`].
pub(crate) async fn resolve_graph(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: i64,
    scope: Option<i64>,
) -> Result<Option<i64>, ServiceError> {
    let sql = format!(
        "SELECT graph_id FROM {} WHERE id = ? AND (? IS NULL OR graph_id = ?) ORDER BY graph_id LIMIT 2",
        table(kind)
    );
    let graphs: Vec<i64> = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(scope)
        .bind(scope)
        .fetch_all(conn)
        .await?;

    match graphs.as_slice() {
        [] => Ok(None),
        [graph_id] => Ok(Some(*graph_id)),
        _ => Err(ServiceError::Ambiguous(format!(
            "{kind} {id} exists in several graphs; pass graph_id to select one"
        ))),
    }
}

/// `WHERE` clause matching entity `?1` in the one graph it resolves to under
/// scope `?2`. An unscoped id held by several graphs matches nothing, so
/// writes built on it never touch more than one row.
fn scoped_row(kind: EntityKind) -> String {
    format!(
        "id = ?1 AND graph_id = (
            SELECT MIN(graph_id) FROM {table}
            WHERE id = ?1 AND (?2 IS NULL OR graph_id = ?2)
            GROUP BY id
            HAVING COUNT(*) = 1
        )",
        table = table(kind)
    )
}

/// Deletes entity `id` under `scope` in a single statement. Returns the
/// owning graph when a row was removed.
async fn delete_scoped(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: i64,
    scope: Option<i64>,
) -> Result<Option<i64>, ServiceError> {
    let sql = format!(
        "DELETE FROM {} WHERE {} RETURNING graph_id",
        table(kind),
        scoped_row(kind)
    );
    // RETURNING statements run to completion so the write commits before the
    // connection is reused.
    let graph_ids: Vec<i64> = sqlx::query_scalar(&sql)
        .bind(id)
        .bind(scope)
        .fetch_all(conn)
        .await?;
    Ok(graph_ids.into_iter().next())
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

pub(crate) async fn insert_service(
    conn: &mut SqliteConnection,
    svc: &NewService,
) -> Result<(), ServiceError> {
    sqlx::query(
        r"
        INSERT INTO services (id, graph_id, name, description, x, y)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(svc.id)
    .bind(svc.graph_id)
    .bind(&svc.name)
    .bind(&svc.description)
    .bind(svc.x)
    .bind(svc.y)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_service(
    conn: &mut SqliteConnection,
    graph_id: i64,
    id: i64,
) -> Result<Option<Service>, ServiceError> {
    let row = sqlx::query_as::<_, ServiceRow>(
        r"
        SELECT id, graph_id, name, description, x, y
        FROM services
        WHERE graph_id = ? AND id = ?
        ",
    )
    .bind(graph_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Service::from))
}

pub(crate) async fn fetch_services(
    conn: &mut SqliteConnection,
    graph_id: i64,
) -> Result<Vec<Service>, ServiceError> {
    let rows = sqlx::query_as::<_, ServiceRow>(
        r"
        SELECT id, graph_id, name, description, x, y
        FROM services
        WHERE graph_id = ?
        ORDER BY id ASC
        ",
    )
    .bind(graph_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Service::from).collect())
}

/// Applies the supplied patch fields to service `id` under `scope` in a
/// single statement and returns the stored row, or `None` when no row
/// matched.
pub(crate) async fn update_service(
    conn: &mut SqliteConnection,
    id: i64,
    scope: Option<i64>,
    patch: &ServicePatch,
) -> Result<Option<Service>, ServiceError> {
    let sql = format!(
        r"
        UPDATE services
        SET name = COALESCE(?3, name),
            description = COALESCE(?4, description),
            x = COALESCE(?5, x),
            y = COALESCE(?6, y)
        WHERE {}
        RETURNING id, graph_id, name, description, x, y
        ",
        scoped_row(EntityKind::Service)
    );
    let rows = sqlx::query_as::<_, ServiceRow>(&sql)
        .bind(id)
        .bind(scope)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.x)
        .bind(patch.y)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().next().map(Service::from))
}

/// Deletes service `id` under `scope`. Returns the owning graph when a row
/// was removed.
pub(crate) async fn delete_service(
    conn: &mut SqliteConnection,
    id: i64,
    scope: Option<i64>,
) -> Result<Option<i64>, ServiceError> {
    delete_scoped(conn, EntityKind::Service, id, scope).await
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

pub(crate) async fn insert_relation(
    conn: &mut SqliteConnection,
    rel: &NewRelation,
) -> Result<(), ServiceError> {
    sqlx::query(
        r"
        INSERT INTO relations (id, graph_id, name, description, from_service, to_service)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(rel.id)
    .bind(rel.graph_id)
    .bind(&rel.name)
    .bind(&rel.description)
    .bind(rel.from_service)
    .bind(rel.to_service)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_relation(
    conn: &mut SqliteConnection,
    graph_id: i64,
    id: i64,
) -> Result<Option<Relation>, ServiceError> {
    let row = sqlx::query_as::<_, RelationRow>(
        r"
        SELECT id, graph_id, name, description, from_service, to_service
        FROM relations
        WHERE graph_id = ? AND id = ?
        ",
    )
    .bind(graph_id)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Relation::from))
}

pub(crate) async fn fetch_relations(
    conn: &mut SqliteConnection,
    graph_id: i64,
) -> Result<Vec<Relation>, ServiceError> {
    let rows = sqlx::query_as::<_, RelationRow>(
        r"
        SELECT id, graph_id, name, description, from_service, to_service
        FROM relations
        WHERE graph_id = ?
        ORDER BY id ASC
        ",
    )
    .bind(graph_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Relation::from).collect())
}

pub(crate) async fn update_relation(
    conn: &mut SqliteConnection,
    id: i64,
    scope: Option<i64>,
    patch: &RelationPatch,
) -> Result<Option<Relation>, ServiceError> {
    let sql = format!(
        r"
        UPDATE relations
        SET name = COALESCE(?3, name),
            description = COALESCE(?4, description),
            from_service = COALESCE(?5, from_service),
            to_service = COALESCE(?6, to_service)
        WHERE {}
        RETURNING id, graph_id, name, description, from_service, to_service
        ",
        scoped_row(EntityKind::Relation)
    );
    let rows = sqlx::query_as::<_, RelationRow>(&sql)
        .bind(id)
        .bind(scope)
        .bind(patch.name.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.from_service)
        .bind(patch.to_service)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().next().map(Relation::from))
}

pub(crate) async fn delete_relation(
    conn: &mut SqliteConnection,
    id: i64,
    scope: Option<i64>,
) -> Result<Option<i64>, ServiceError> {
    delete_scoped(conn, EntityKind::Relation, id, scope).await
}
