use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hostcall_client::{BatchCall, Client, ClientConfig, ClientError};
use hostcall_host::Host;
use hostcall_protocol::{CallRequest, Envelope, ErrorCode};
use hostcall_transport::Transport;
use serde_json::{json, Value};

/// Answers by channel name after an optional delay.
struct Scripted {
    available: bool,
    calls: AtomicUsize,
    completed: AtomicUsize,
}

impl Scripted {
    fn new(available: bool) -> Arc<Self> {
        Arc::new(Self {
            available,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transport for Scripted {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn call(&self, request: CallRequest) -> hostcall_transport::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let channel = request.channel().unwrap_or_default().to_string();
        let reply = match channel.as_str() {
            "test:slow" => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                json!({"success": true, "data": "late", "timestamp": 1})
            }
            "test:no-data" => json!({"success": true, "timestamp": 1}),
            "test:null" => json!({"success": true, "data": null, "timestamp": 1}),
            "test:future-code" => json!({
                "success": false,
                "error": "新错误",
                "errorCode": "E_FROM_THE_FUTURE",
                "timestamp": 1
            }),
            "test:garbage" => json!({"success": "maybe"}),
            _ => json!({"success": true, "data": channel, "timestamp": 1}),
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(reply)
    }
}

fn client_with(transport: Arc<Scripted>, timeout: Duration) -> Client {
    Client::with_config(
        transport,
        ClientConfig {
            request_timeout: timeout,
        },
    )
}

#[tokio::test]
async fn timeout_wins_and_late_response_is_dropped() {
    let transport = Scripted::new(true);
    let client = client_with(Arc::clone(&transport), Duration::from_millis(50));

    let err = client
        .invoke::<String>("test:slow", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Timeout { .. }));
    assert_eq!(err.to_string(), "IPC调用超时: test:slow");
    assert_eq!(err.code(), "E_REQUEST_TIMEOUT");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(transport.completed.load(Ordering::SeqCst), 0);

    let echoed: String = client.invoke("test:echo", vec![]).await.unwrap();
    assert_eq!(echoed, "test:echo");
}

#[tokio::test]
async fn unavailable_transport_is_never_called() {
    let transport = Scripted::new(false);
    let client = Client::new(transport.clone());

    let err = client.invoke::<Value>("system:info", vec![]).await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable));
    assert_eq!(err.code(), "E_NETWORK_UNAVAILABLE");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    assert!(!client.test_connection().await);
}

#[tokio::test]
async fn success_without_data_is_a_protocol_violation() {
    let client = Client::new(Scripted::new(true));
    let err = client
        .invoke::<Value>("test:no-data", vec![])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "IPC响应数据为空: test:no-data");

    // Explicit null is data.
    client.invoke::<()>("test:null", vec![]).await.unwrap();

    let err = client
        .invoke::<Value>("test:garbage", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Protocol(_)));
}

#[tokio::test]
async fn safe_invoke_keeps_remote_codes() {
    let client = Client::new(Scripted::new(true));

    let env: Envelope<String> = client.safe_invoke("test:future-code", vec![]).await;
    assert_eq!(env.error_message(), Some("新错误"));
    assert_eq!(env.error_code(), Some("E_FROM_THE_FUTURE"));

    let env: Envelope<String> = client.safe_invoke("test:echo", vec![]).await;
    assert_eq!(env.data().map(String::as_str), Some("test:echo"));
}

#[tokio::test]
async fn safe_invoke_classifies_local_failures() {
    let client = client_with(Scripted::new(true), Duration::from_millis(20));
    let env: Envelope<Value> = client.safe_invoke("test:slow", vec![]).await;
    assert_eq!(env.error_code(), Some(ErrorCode::RequestTimeout.as_str()));
    assert_eq!(env.error_message(), Some("IPC调用超时: test:slow"));

    let env: Envelope<u32> = client.safe_invoke("test:echo", vec![]).await;
    assert_eq!(env.error_code(), Some("E_UNKNOWN_ERROR"));
}

#[tokio::test]
async fn timeout_can_be_changed_at_runtime() {
    let client = Client::new(Scripted::new(true));
    assert_eq!(client.request_timeout(), Duration::from_secs(10));

    let clone = client.clone();
    clone.set_request_timeout(Duration::from_millis(1500));
    assert_eq!(client.status().timeout_ms, 1500);
    assert!(client.status().is_available);
}

#[tokio::test]
async fn batch_returns_partial_results() {
    let host = Host::headless().unwrap();
    let client = Client::new(Arc::new(host.local_transport()));

    let results = client
        .batch_invoke(vec![
            BatchCall::new("version", "system:app-version", vec![]),
            BatchCall::new("missing", "file:read", vec![json!("/nope.txt")]),
            BatchCall::new("config", "config:get", vec![]),
        ])
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results["version"], json!(host.config().app_version));
    assert_eq!(results["config"]["language"], "zh-CN");
    assert!(!results.contains_key("missing"));
}

#[tokio::test]
async fn typed_calls_through_a_local_host() {
    let host = Host::headless().unwrap();
    let client = Client::new(Arc::new(host.local_transport()));
    assert!(client.test_connection().await);

    let err = client.read_file("/nope.txt").await.unwrap_err();
    assert_eq!(err.to_string(), "文件不存在: /nope.txt");
    assert_eq!(err.code(), "E_FILE_NOT_FOUND");

    let env = client.safe_read_file("/nope.txt").await;
    assert_eq!(env.error_code(), Some("E_FILE_NOT_FOUND"));

    client.maximize_window().await.unwrap();
    assert!(client.window_state().await.unwrap().is_maximized);

    let mut patch = serde_json::Map::new();
    patch.insert("autoPlay".into(), json!(true));
    let config = client.set_app_config(patch).await.unwrap();
    assert!(config.auto_play);
    assert!(client.app_config().await.unwrap().auto_play);
}

#[tokio::test]
async fn events_reach_the_client() {
    let host = Host::headless().unwrap();
    let client = Client::new(Arc::new(host.local_transport()));
    let mut events = client.events().expect("local transport carries events");

    client.minimize_window().await.unwrap();
    let event = events.recv().await.unwrap();
    assert_eq!(event.channel.as_str(), "window:state-changed");
    assert_eq!(event.payload["isMinimized"], true);
}
