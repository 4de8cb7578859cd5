//! Integration tests for the Svcgraph Server HTTP API.
//!
//! Each test starts a server on an ephemeral port and uses reqwest to
//! exercise the endpoints.

use reqwest::Client;
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use svcgraph_server::AppState;
use svcgraph_service::{ServiceConfig, ServiceState};

/// Boots a server on an OS-assigned port over `service`.
/// Returns the base URL (e.g. "http://127.0.0.1:12345").
async fn spawn_with(service: ServiceState) -> String {
    let app = svcgraph_server::router(AppState::new(service, vec![]));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        svcgraph_server::serve(listener, app, std::future::pending())
            .await
            .unwrap();
    });

    format!("http://{addr}")
}

/// Boots an in-memory server.
async fn spawn_server() -> String {
    spawn_with(ServiceState::new_in_memory().await.unwrap()).await
}

async fn create_graph(client: &Client, base: &str, id: i64) {
    let resp = client
        .post(format!("{base}/api/v1/graphs"))
        .json(&json!({"id": id, "name": format!("graph-{id}")}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
}

async fn create_service(client: &Client, base: &str, graph_id: i64, id: i64) -> reqwest::Response {
    client
        .post(format!("{base}/api/v1/services"))
        .json(&json!({
            "id": id,
            "graph_id": graph_id,
            "name": format!("svc-{id}"),
            "description": "",
            "x": 0.0,
            "y": 0.0,
        }))
        .send()
        .await
        .unwrap()
}

async fn get_json(client: &Client, url: String) -> (u16, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_returns_pong() {
    let base = spawn_server().await;
    let client = Client::new();

    let (status, body) = get_json(&client, format!("{base}/api/v1/ping")).await;
    assert_eq!(status, 200);
    assert_eq!(body["response"], "pong");
}

#[tokio::test]
async fn health_returns_ok() {
    let base = spawn_server().await;
    let client = Client::new();

    let (status, body) = get_json(&client, format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["persistent"], false);
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn request_id_generated_when_absent() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    let request_id = resp
        .headers()
        .get("x-request-id")
        .expect("missing x-request-id");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn request_id_preserved_when_provided() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/api/v1/graph/1"))
        .header("x-request-id", "my-custom-id-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(
        resp.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "my-custom-id-123"
    );
}

#[tokio::test]
async fn metrics_report_counts_and_operations() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;
    assert_eq!(create_service(&client, &base, 1, 0).await.status(), 201);

    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = resp.text().await.unwrap();
    assert!(body.contains("svcgraph_graphs_total 1"));
    assert!(body.contains("svcgraph_services_total 1"));
    assert!(body.contains("svcgraph_operations_total{entity=\"service\",op=\"create\"} 1"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let base = spawn_server().await;
    let client = Client::new();

    let (status, body) = get_json(&client, format!("{base}/api/openapi.json")).await;
    assert_eq!(status, 200);
    assert!(body["paths"]["/api/v1/graph/{id}"]["get"].is_object());
    assert!(body["paths"]["/api/v1/relations"]["post"].is_object());
}

// ---------------------------------------------------------------------------
// Graph assembly
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_graph_has_empty_arrays() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    let (status, body) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], 1);
    assert_eq!(body["max_node_id"], 0);
    assert_eq!(body["max_edge_id"], 0);
    assert_eq!(body["services"], json!([]));
    assert_eq!(body["relations"], json!([]));
}

#[tokio::test]
async fn missing_graph_is_404() {
    let base = spawn_server().await;
    let client = Client::new();

    let (status, body) = get_json(&client, format!("{base}/api/v1/graph/77")).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn create_then_read_graph() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    assert_eq!(create_service(&client, &base, 1, 4).await.status(), 201);
    assert_eq!(create_service(&client, &base, 1, 2).await.status(), 201);

    let resp = client
        .post(format!("{base}/api/v1/relations"))
        .json(&json!({
            "id": 0,
            "graph_id": 1,
            "name": "calls",
            "description": "sync",
            "from_service": 2,
            "to_service": 4,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let (status, body) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(status, 200);
    assert_eq!(body["max_node_id"], 5);
    assert_eq!(body["max_edge_id"], 1);
    let ids: Vec<i64> = body["services"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 4]);
    assert_eq!(body["relations"][0]["from_service"], 2);
    assert_eq!(body["relations"][0]["to_service"], 4);

    let (status, ids) = get_json(&client, format!("{base}/api/v1/graph/1/next-ids")).await;
    assert_eq!(status, 200);
    assert_eq!(ids["next_node_id"], 5);
    assert_eq!(ids["next_edge_id"], 1);
}

#[tokio::test]
async fn list_and_delete_graphs() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 2).await;
    create_graph(&client, &base, 1).await;
    assert_eq!(create_service(&client, &base, 2, 0).await.status(), 201);

    let (status, body) = get_json(&client, format!("{base}/api/v1/graphs")).await;
    assert_eq!(status, 200);
    let graphs = body.as_array().unwrap();
    assert_eq!(graphs.len(), 2);
    assert_eq!(graphs[0]["id"], 1);
    assert_eq!(graphs[1]["service_count"], 1);

    let resp = client
        .delete(format!("{base}/api/v1/graph/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, _) = get_json(&client, format!("{base}/api/v1/services/0")).await;
    assert_eq!(status, 404);

    let resp = client
        .delete(format!("{base}/api/v1/graph/2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn graph_created_without_id_gets_one() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/v1/graphs"))
        .json(&json!({"name": "auto"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert!(body["id"].is_i64());
    assert_eq!(body["name"], "auto");
}

// ---------------------------------------------------------------------------
// Services and relations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_service_is_404() {
    let base = spawn_server().await;
    let client = Client::new();

    let (status, body) = get_json(&client, format!("{base}/api/v1/services/99")).await;
    assert_eq!(status, 404);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn service_without_id_is_rejected() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    let resp = client
        .post(format!("{base}/api/v1/services"))
        .json(&json!({"graph_id": 1, "name": "anonymous"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let (_, graph) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(graph["max_node_id"], 0);
}

#[tokio::test]
async fn service_in_missing_graph_is_404() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = create_service(&client, &base, 9, 1).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn duplicate_service_conflicts() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    assert_eq!(create_service(&client, &base, 1, 3).await.status(), 201);
    let resp = create_service(&client, &base, 1, 3).await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn relation_with_dangling_endpoints_is_accepted() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    let resp = client
        .post(format!("{base}/api/v1/relations"))
        .json(&json!({
            "id": 10,
            "graph_id": 1,
            "name": "ghost",
            "from_service": 100,
            "to_service": 200,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let (_, graph) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(graph["max_edge_id"], 11);
    assert_eq!(graph["relations"][0]["to_service"], 200);
}

#[tokio::test]
async fn update_is_partial() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;
    assert_eq!(create_service(&client, &base, 1, 1).await.status(), 201);

    let resp = client
        .put(format!("{base}/api/v1/services/1"))
        .json(&json!({"description": "payments", "x": 12.5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["name"], "svc-1");
    assert_eq!(body["description"], "payments");
    assert_eq!(body["x"], 12.5);

    let resp = client
        .put(format!("{base}/api/v1/relations/5"))
        .json(&json!({"name": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn delete_keeps_watermark_and_is_idempotent() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;
    assert_eq!(create_service(&client, &base, 1, 6).await.status(), 201);

    let resp = client
        .delete(format!("{base}/api/v1/services/6"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], true);

    let resp = client
        .delete(format!("{base}/api/v1/services/6"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], false);

    let (_, graph) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(graph["max_node_id"], 7);
    assert_eq!(graph["services"], json!([]));
}

#[tokio::test]
async fn shared_id_needs_graph_scope() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;
    create_graph(&client, &base, 2).await;
    assert_eq!(create_service(&client, &base, 1, 3).await.status(), 201);
    assert_eq!(create_service(&client, &base, 2, 3).await.status(), 201);

    let (status, body) = get_json(&client, format!("{base}/api/v1/services/3")).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"], "ambiguous_id");

    let (status, body) =
        get_json(&client, format!("{base}/api/v1/services/3?graph_id=2")).await;
    assert_eq!(status, 200);
    assert_eq!(body["graph_id"], 2);
}

#[tokio::test]
async fn concurrent_creates_leave_watermark_above_every_id() {
    let base = spawn_server().await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    let mut handles = Vec::new();
    for id in [3, 7, 1, 5] {
        let client = client.clone();
        let base = base.clone();
        handles.push(tokio::spawn(async move {
            create_service(&client, &base, 1, id).await.status().as_u16()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 201);
    }

    let (_, graph) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(graph["max_node_id"], 8);
    assert_eq!(graph["services"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn concurrent_writes_on_file_store_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let service = ServiceState::open(&ServiceConfig {
        database_url: Some(format!("sqlite://{}", dir.path().join("graphs.db").display())),
        max_connections: 8,
    })
    .await
    .unwrap();
    let base = spawn_with(service).await;
    let client = Client::new();
    create_graph(&client, &base, 1).await;

    let mut creates = Vec::new();
    for id in [3, 7, 1, 5, 0, 2, 4, 6] {
        let client = client.clone();
        let base = base.clone();
        creates.push(tokio::spawn(async move {
            create_service(&client, &base, 1, id).await.status().as_u16()
        }));
    }
    for handle in creates {
        assert_eq!(handle.await.unwrap(), 201);
    }

    let mut writes = Vec::new();
    for id in 0..8 {
        let client = client.clone();
        let base = base.clone();
        writes.push(tokio::spawn(async move {
            let url = format!("{base}/api/v1/services/{id}");
            let resp = if id % 2 == 0 {
                client.put(url).json(&json!({"name": "renamed"})).send().await
            } else {
                client.delete(url).send().await
            };
            resp.unwrap().status().as_u16()
        }));
    }
    for handle in writes {
        assert_eq!(handle.await.unwrap(), 200);
    }

    let (_, graph) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(graph["max_node_id"], 8);
    let services = graph["services"].as_array().unwrap();
    assert_eq!(services.len(), 4);
    assert!(services.iter().all(|s| s["name"] == "renamed"));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        database_url: Some(format!("sqlite://{}", dir.path().join("graphs.db").display())),
        max_connections: 4,
    };
    let client = Client::new();

    let service = ServiceState::open(&config).await.unwrap();
    let base = spawn_with(service.clone()).await;
    create_graph(&client, &base, 1).await;
    assert_eq!(create_service(&client, &base, 1, 9).await.status(), 201);
    let (_, health) = get_json(&client, format!("{base}/health")).await;
    assert_eq!(health["persistent"], true);
    service.close().await;

    let reopened = ServiceState::open(&config).await.unwrap();
    let base = spawn_with(reopened).await;
    let (status, graph) = get_json(&client, format!("{base}/api/v1/graph/1")).await;
    assert_eq!(status, 200);
    assert_eq!(graph["max_node_id"], 10);
    assert_eq!(graph["services"][0]["id"], 9);
}
