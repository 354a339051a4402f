use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use bytes::Bytes;
use parking_lot::Mutex;
use replix_core::testing::{MockReplicaClient, ReplicaBehavior, TestContext};
use replix_core::{
    Connection, ConnectionPool, DurabilityLog, Error, Proxy, ReplicationConfig,
    ReplicationCoordinator, ResultCache, Router as QueryRouter, WritePath, WriteRecord,
};
use replix_server::api::write::{ASYNC_ACCEPTED, SYNC_COMMITTED, WRITE_ID_HEADER};
use replix_server::config::{Config, Role};
use replix_server::{PrimaryState, ReplicaState, ReplixServer};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Answers every query with `"<target>:<query>"`
#[derive(Clone, Default)]
struct EchoConnection {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Connection for EchoConnection {
    async fn send(&self, url: &str, body: Bytes) -> replix_core::Result<Bytes> {
        self.seen.lock().push(url.to_string());
        if url.contains("down") {
            return Err(Error::upstream(url, "connection refused"));
        }
        Ok(Bytes::from(format!("{url}:{}", String::from_utf8_lossy(&body))))
    }
}

struct Primary {
    app: Router,
    conn: EchoConnection,
    pool: Arc<ConnectionPool<EchoConnection>>,
    client: Arc<MockReplicaClient>,
    log: Arc<DurabilityLog>,
    _ctx: TestContext,
}

fn primary_with(client: MockReplicaClient, pool_capacity: usize, primary_addr: &str) -> Primary {
    let ctx = TestContext::new();
    let conn = EchoConnection::default();

    let pool = Arc::new(ConnectionPool::new(pool_capacity, || conn.clone()).unwrap());
    let cache = ResultCache::new(Duration::from_secs(60)).unwrap();
    let router = QueryRouter::new(
        primary_addr,
        vec!["replica-0".to_string(), "replica-1".to_string()].into(),
    )
    .unwrap();
    let proxy = Proxy::new(pool.clone(), Arc::new(cache), router);

    let client = Arc::new(client);
    let config = ReplicationConfig::new(vec!["http://r0".into(), "http://r1".into()])
        .with_send_timeout(Duration::from_millis(200));
    let coordinator = ReplicationCoordinator::new(&config, client.clone()).unwrap();
    let log = Arc::new(DurabilityLog::open(ctx.path().join("primary.log"), false).unwrap());
    let write_path = WritePath::new(log.clone(), Arc::new(coordinator));

    let server = ReplixServer::primary(PrimaryState::new(Arc::new(proxy), write_path));
    assert_eq!(server.role(), Role::Primary);

    Primary {
        app: server.router(),
        conn,
        pool,
        client,
        log,
        _ctx: ctx,
    }
}

fn primary() -> Primary {
    primary_with(MockReplicaClient::new(), 2, "primary")
}

async fn make_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Body,
) -> (StatusCode, axum::http::HeaderMap, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();

    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (
        status,
        headers,
        String::from_utf8(body_bytes.to_vec()).unwrap_or_default(),
    )
}

fn record_body(name: &str, user_id: i64) -> Body {
    Body::from(json!({"name": name, "user_id": user_id, "is_active": true}).to_string())
}

#[tokio::test]
async fn test_query_routes_reads_and_writes() {
    let node = primary();

    let (status, _, body) = make_request(
        &node.app,
        Method::POST,
        "/query",
        Body::from("INSERT INTO t VALUES (1)"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "primary:INSERT INTO t VALUES (1)");

    let (_, _, first) = make_request(&node.app, Method::POST, "/query", Body::from("SELECT 1")).await;
    let (_, _, second) = make_request(&node.app, Method::POST, "/query", Body::from("SELECT 2")).await;
    assert_eq!(first, "replica-0:SELECT 1");
    assert_eq!(second, "replica-1:SELECT 2");

    // Cache hit: the connection is not used again.
    let (_, _, cached) = make_request(&node.app, Method::POST, "/query", Body::from("SELECT 1")).await;
    assert_eq!(cached, first);
    assert_eq!(node.conn.seen.lock().len(), 3);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let node = primary();
    let (status, _, body) = make_request(&node.app, Method::POST, "/query", Body::from("  ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_non_utf8_query_rejected() {
    let node = primary();
    let (status, headers, body) = make_request(
        &node.app,
        Method::POST,
        "/query",
        Body::from(vec![0xff, 0xfe, b'S']),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["content-type"], "application/json");
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["kind"], "bad_request");
    assert!(node.conn.seen.lock().is_empty());
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let node = primary_with(MockReplicaClient::new(), 1, "primary-down");
    let (status, _, body) =
        make_request(&node.app, Method::POST, "/query", Body::from("DELETE FROM t")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["kind"], "upstream");
}

#[tokio::test]
async fn test_pool_exhausted_is_service_unavailable() {
    let node = primary_with(MockReplicaClient::new(), 1, "primary");
    let held = node.pool.acquire().unwrap();

    let (status, _, body) =
        make_request(&node.app, Method::POST, "/query", Body::from("UPDATE t SET a = 1")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["kind"], "connection_unavailable");

    node.pool.release(held);
    let (status, _, _) =
        make_request(&node.app, Method::POST, "/query", Body::from("UPDATE t SET a = 1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_async_write() {
    let node = primary();
    let (status, headers, body) =
        make_request(&node.app, Method::POST, "/write/async", record_body("ada", 1)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, ASYNC_ACCEPTED);
    assert!(headers.contains_key(WRITE_ID_HEADER));
    assert_eq!(node.log.replay().unwrap(), vec![WriteRecord::new("ada", 1, true)]);
}

#[tokio::test]
async fn test_sync_write_committed() {
    let node = primary();
    let (status, _, body) =
        make_request(&node.app, Method::POST, "/write/sync", record_body("alan", 2)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, SYNC_COMMITTED);
    assert_eq!(node.client.received().len(), 2);
}

#[tokio::test]
async fn test_sync_write_partial_failure() {
    let client = MockReplicaClient::new().with("http://r1", ReplicaBehavior::Hang);
    let node = primary_with(client, 2, "primary");

    let (status, _, body) =
        make_request(&node.app, Method::POST, "/write/sync", record_body("grace", 3)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["kind"], "partial_replication");
    // Durable locally even though replication failed.
    assert_eq!(node.log.appended(), 1);
}

#[tokio::test]
async fn test_malformed_write_rejected() {
    let node = primary();

    for body in [
        "not json".to_string(),
        json!({"name": "x", "is_active": true}).to_string(),
        r#"{"name":"x","user_id":9223372036854775808,"is_active":true}"#.to_string(),
    ] {
        let (status, _, _) =
            make_request(&node.app, Method::POST, "/write/sync", Body::from(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    assert_eq!(node.log.appended(), 0);
    assert!(node.client.received().is_empty());
}

#[tokio::test]
async fn test_stats_and_cache_clear() {
    let node = primary();
    make_request(&node.app, Method::POST, "/query", Body::from("SELECT 1")).await;
    make_request(&node.app, Method::POST, "/query", Body::from("SELECT 1")).await;

    let (status, _, body) = make_request(&node.app, Method::GET, "/stats", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(stats["pool"]["capacity"], 2);
    assert_eq!(stats["pool"]["acquired"], 1);
    assert_eq!(stats["cache"]["hits"], 1);
    assert_eq!(stats["cache"]["entries"], 1);
    assert_eq!(stats["replication"]["sync_rounds"], 0);

    let (status, _, body) =
        make_request(&node.app, Method::POST, "/cache/clear", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["cleared"], 1);
}

#[tokio::test]
async fn test_primary_health() {
    let node = primary();
    let (status, _, body) = make_request(&node.app, Method::GET, "/health", Body::empty()).await;

    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["role"], "primary");
}

#[tokio::test]
async fn test_replica_appends_replicated_writes() {
    let ctx = TestContext::new();
    let log = Arc::new(DurabilityLog::open(ctx.path().join("replica.log"), false).unwrap());
    let server: ReplixServer = ReplixServer::replica(ReplicaState::new(log.clone()));
    assert_eq!(server.role(), Role::Replica);
    let app = server.router();

    let (status, _, _) = make_request(&app, Method::POST, "/replicate", record_body("ada", 9)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log.replay().unwrap(), vec![WriteRecord::new("ada", 9, true)]);

    let (status, _, _) =
        make_request(&app, Method::POST, "/replicate", Body::from("{\"broken\"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Primary-only routes are not mounted on a replica.
    let (status, _, _) = make_request(&app, Method::POST, "/query", Body::from("SELECT 1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, _, body) = make_request(&app, Method::GET, "/health", Body::empty()).await;
    let health: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["role"], "replica");
    assert_eq!(health["log_appended"], 1);
}

#[tokio::test]
async fn test_from_config_builds_both_roles() {
    let ctx = TestContext::new();

    let primary = Config::default().with_data_dir(ctx.path());
    let server = ReplixServer::from_config(&primary).unwrap();
    assert_eq!(server.role(), Role::Primary);
    assert!(ctx.path().join("primary.log").exists());

    let replica = Config::default()
        .with_data_dir(ctx.path())
        .with_role(Role::Replica);
    let server = ReplixServer::from_config(&replica).unwrap();
    assert_eq!(server.role(), Role::Replica);
    assert!(ctx.path().join("replica.log").exists());
}
