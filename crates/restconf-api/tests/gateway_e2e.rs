//! E2E tests for the RESTCONF gateway over real HTTP
//!
//! Tests the full flow:
//! 1. Edit the datastore via POST / PUT / DELETE on data resources
//! 2. Read the result back and verify the rendered JSON
//! 3. Subscribe to an event stream and receive engine notifications

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use restconf_api::{
    create_router, AppState, EventBroadcastHub, HubConfig, OverflowPolicy, RestconfService,
    ServiceConfig,
};
use restconf_core::{
    DataNode, DataRequest, EditIntent, NotificationEvent, NotificationKind, OperationType,
    RestconfError, RestconfResult, TreeEngine,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

// =============================================================================
// Mock Engine
// =============================================================================

/// Flat engine keyed by the rendered identifier; stores the body nodes of
/// the last create/replace and returns them wrapped in the target name
struct MockEngine {
    store: Mutex<HashMap<String, Vec<DataNode>>>,
    notifications: broadcast::Sender<NotificationEvent>,
}

impl MockEngine {
    fn new() -> Self {
        let (notifications, _) = broadcast::channel(16);
        Self {
            store: Mutex::new(HashMap::new()),
            notifications,
        }
    }
}

#[async_trait::async_trait]
impl TreeEngine for MockEngine {
    async fn execute(&self, request: DataRequest) -> RestconfResult<Option<DataNode>> {
        let key = request.identifier.to_string();
        let name = request
            .identifier
            .target()
            .map(|e| e.name.clone())
            .unwrap_or_default();
        let mut store = self.store.lock();

        match request.operation {
            OperationType::Query => Ok(store
                .get(&key)
                .map(|children| DataNode::container(name, children.clone()))),
            OperationType::EditConfig(EditIntent::Create) => {
                if store.contains_key(&key) {
                    return Err(RestconfError::Conflict(key));
                }
                store.insert(key, request.payload);
                Ok(None)
            }
            OperationType::EditConfig(EditIntent::Replace) => {
                store.insert(key, request.payload);
                Ok(None)
            }
            OperationType::EditConfig(EditIntent::Delete) => store
                .remove(&key)
                .map(|_| None)
                .ok_or(RestconfError::NotFound(key)),
        }
    }

    fn notifications(&self) -> Option<broadcast::Receiver<NotificationEvent>> {
        Some(self.notifications.subscribe())
    }
}

// =============================================================================
// Test Server
// =============================================================================

/// A test server that shuts down when dropped
struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    state: AppState,
    engine: Arc<MockEngine>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn start(hub: HubConfig) -> Self {
        let engine = Arc::new(MockEngine::new());
        let service = RestconfService::new(
            engine.clone(),
            EventBroadcastHub::new(hub),
            ServiceConfig::default(),
        );
        service.start_notification_bridge();
        let state = AppState::new(service);

        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = create_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            state,
            engine,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn notify(&self, event: NotificationEvent) {
        self.engine.notifications.send(event).unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.state.service.hub().shutdown();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn hub_config(worker_pool_size: usize) -> HubConfig {
    HubConfig {
        worker_pool_size,
        queue_capacity: 16,
        overflow: OverflowPolicy::Block,
    }
}

/// Read body chunks until one complete line is buffered
async fn next_line<S>(stream: &mut S, buffer: &mut String) -> String
where
    S: futures_util::Stream<Item = reqwest::Result<bytes::Bytes>> + Unpin,
{
    loop {
        if let Some(end) = buffer.find("\r\n") {
            let line = buffer[..end].to_string();
            buffer.drain(..end + 2);
            return line;
        }
        let chunk = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for stream data")
            .expect("stream ended")
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
}

// =============================================================================
// Data Resources
// =============================================================================

#[tokio::test]
async fn test_create_read_replace_delete_cycle() {
    let server = TestServer::start(HubConfig::default()).await;
    let uri = "/onos/restconf/data/test:top/interface=eth0";

    let resp = server
        .client
        .post(server.url(uri))
        .body(r#"{"mtu": 1500, "addr": ["10.0.0.2", "10.0.0.1"]}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()["location"], uri);

    let body: Value = server
        .client
        .get(server.url(uri))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        json!({"interface": {"mtu": "1500", "addr": ["10.0.0.1", "10.0.0.2"]}})
    );

    let resp = server
        .client
        .put(server.url(uri))
        .body(r#"{"mtu": 9000}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let body: Value = server
        .client
        .get(server.url(uri))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"interface": {"mtu": "9000"}}));

    let resp = server.client.delete(server.url(uri)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = server.client.get(server.url(uri)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_create_conflicts() {
    let server = TestServer::start(HubConfig::default()).await;
    let uri = server.url("/onos/restconf/data/test:top");

    let first = server.client.post(&uri).body("{}").send().await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = server.client.post(&uri).body("{}").send().await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_bad_requests() {
    let server = TestServer::start(HubConfig::default()).await;

    let resp = server
        .client
        .post(server.url("/onos/restconf/data/test:top"))
        .body(r#"{"mtu": null}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("mtu"));

    let resp = server
        .client
        .get(server.url("/onos/restconf/data/test:list="))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_percent_encoded_keys_are_decoded() {
    let server = TestServer::start(HubConfig::default()).await;

    let resp = server
        .client
        .put(server.url("/onos/restconf/data/test:top/name=a%2Fb"))
        .body(r#"{"x": "1"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The engine sees one element with the decoded key, re-encoded on display
    let keys: Vec<String> = server.engine.store.lock().keys().cloned().collect();
    assert_eq!(keys, vec!["/test:top/name=a%2Fb".to_string()]);
}

// =============================================================================
// Event Streams
// =============================================================================

#[tokio::test]
async fn test_stream_receives_yang_notifications_as_lines() {
    let server = TestServer::start(hub_config(2)).await;

    let resp = server
        .client
        .get(server.url("/onos/restconf/streams/NETCONF"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/json");
    assert!(resp.headers().contains_key("x-subscription-id"));
    assert_eq!(server.state.service.hub().subscriber_count(), 1);

    let mut stream = Box::pin(resp.bytes_stream());
    let mut buffer = String::new();

    server.notify(NotificationEvent::new(
        NotificationKind::SnmpEvent,
        json!({"trap": "ignored"}),
    ));
    server.notify(NotificationEvent::yang(json!({"alarm": {"id": "1"}})));
    server.notify(NotificationEvent::yang(json!({"alarm": {"id": "2"}})));

    let first: Value = serde_json::from_str(&next_line(&mut stream, &mut buffer).await).unwrap();
    let second: Value = serde_json::from_str(&next_line(&mut stream, &mut buffer).await).unwrap();
    assert_eq!(first, json!({"alarm": {"id": "1"}}));
    assert_eq!(second, json!({"alarm": {"id": "2"}}));
}

#[tokio::test]
async fn test_disconnected_stream_is_deregistered() {
    let server = TestServer::start(hub_config(2)).await;
    let hub = server.state.service.hub().clone();

    let kept = server
        .client
        .get(server.url("/onos/restconf/streams/NETCONF"))
        .send()
        .await
        .unwrap();
    let dropped = server
        .client
        .get(server.url("/onos/restconf/streams/NETCONF"))
        .send()
        .await
        .unwrap();
    assert_eq!(hub.subscriber_count(), 2);
    drop(dropped);

    // Deregistration is reactive: it happens on a failed write
    for _ in 0..100 {
        hub.publish(&json!({"tick": true})).await;
        if hub.subscriber_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(hub.subscriber_count(), 1);

    // The remaining subscriber still gets every event
    let mut stream = Box::pin(kept.bytes_stream());
    let mut buffer = String::new();
    let line = next_line(&mut stream, &mut buffer).await;
    assert_eq!(line, r#"{"tick":true}"#);
}

#[tokio::test]
async fn test_pool_exhaustion_returns_service_unavailable() {
    let server = TestServer::start(hub_config(1)).await;

    let _first = server
        .client
        .get(server.url("/onos/restconf/streams/NETCONF"))
        .send()
        .await
        .unwrap();

    let second = server
        .client
        .get(server.url("/onos/restconf/streams/NETCONF"))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["error"], "service_unavailable");
}
