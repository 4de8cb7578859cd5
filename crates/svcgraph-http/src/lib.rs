//! Svcgraph HTTP: REST transport adapter for the service graph server.
//!
//! Provides:
//! - Graph assembly and graph lifecycle (`/api/v1/graph/{id}`, `/api/v1/graphs`)
//! - Service and relation CRUD (`/api/v1/services`, `/api/v1/relations`)
//! - Health, ping and Prometheus metrics
//! - The OpenAPI document at `/api/openapi.json`
//! - Request-ID middleware

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

use axum::Router;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use error::ErrorBody;
use middleware::request_id::X_REQUEST_ID;

pub use state::AppState;

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Svcgraph Server API",
        description = "HTTP API for service dependency graphs.\n\nA graph owns services (nodes) and relations (edges). Ids are chosen by clients and are unique within a graph; each graph keeps `max_node_id`/`max_edge_id` watermarks that are always above every id it has seen.",
        version = "0.3.2",
        license(name = "Apache-2.0"),
    ),
    paths(
        routes::system::ping,
        routes::system::health,
        routes::graph::get_graph,
        routes::graph::next_ids,
        routes::graph::list_graphs,
        routes::graph::create_graph,
        routes::graph::delete_graph,
        routes::services::create_service,
        routes::services::get_service,
        routes::services::update_service,
        routes::services::delete_service,
        routes::relations::create_relation,
        routes::relations::get_relation,
        routes::relations::update_relation,
        routes::relations::delete_relation,
    ),
    components(
        schemas(
            types::PingResponse, types::HealthResponse, types::DeleteResponse, ErrorBody,
            svcgraph_service::types::Graph, svcgraph_service::types::GraphSummary,
            svcgraph_service::types::NextIds, svcgraph_service::types::Service,
            svcgraph_service::types::Relation, svcgraph_service::types::NewGraph,
            svcgraph_service::types::NewService, svcgraph_service::types::NewRelation,
            svcgraph_service::types::ServicePatch, svcgraph_service::types::RelationPatch,
        )
    ),
    tags(
        (name = "Graph", description = "Graph assembly, watermarks and lifecycle"),
        (name = "Service", description = "Service (node) management"),
        (name = "Relation", description = "Relation (edge) management"),
        (name = "System", description = "System and health endpoints"),
    )
)]
struct ApiDoc;

/// Returns the OpenAPI document served at `/api/openapi.json`.
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the HTTP API router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ping", get(routes::system::ping))
        // Graphs
        .route(
            "/graphs",
            get(routes::graph::list_graphs).post(routes::graph::create_graph),
        )
        .route(
            "/graph/{id}",
            get(routes::graph::get_graph).delete(routes::graph::delete_graph),
        )
        .route("/graph/{id}/next-ids", get(routes::graph::next_ids))
        // Services
        .route(
            "/services",
            axum::routing::post(routes::services::create_service),
        )
        .route(
            "/services/{id}",
            get(routes::services::get_service)
                .put(routes::services::update_service)
                .delete(routes::services::delete_service),
        )
        // Relations
        .route(
            "/relations",
            axum::routing::post(routes::relations::create_relation),
        )
        .route(
            "/relations/{id}",
            get(routes::relations::get_relation)
                .put(routes::relations::update_relation)
                .delete(routes::relations::delete_relation),
        );

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics_endpoint))
        .route(
            "/api/openapi.json",
            get(|| async { axum::Json(openapi()) }),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            middleware::request_id::request_id_middleware,
        ))
        .layer(cors_layer(&state))
        .with_state(state)
}

/// Serve the HTTP router on the given listener until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.cors_origins();

    // No origins configured: no CORS headers.
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE, X_REQUEST_ID.clone()])
        .expose_headers([X_REQUEST_ID.clone()]);

    if origins.len() == 1 && origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard origin, all cross-origin requests allowed");
        base.allow_origin(tower_http::cors::Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        base.allow_origin(parsed)
    }
}
