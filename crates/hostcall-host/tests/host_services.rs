use std::sync::{Arc, Mutex};

use hostcall_host::services::HeadlessWindow;
use hostcall_host::{Host, HostConfig};
use hostcall_protocol::{CallRequest, Channel, ClassifiedError, Envelope, ErrorKind};
use serde_json::{json, Value};

struct Harness {
    host: Host,
    seen: Arc<Mutex<Vec<ClassifiedError>>>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_window(HeadlessWindow::default())
    }

    fn with_window(window: HeadlessWindow) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = HostConfig {
            config_path: Some(dir.path().join("config.json")),
            log_dir: dir.path().join("logs"),
            ..HostConfig::default()
        };
        let host = Host::builder(config)
            .window(Arc::new(window))
            .build()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        host.hub()
            .add_listener(move |err| sink.lock().unwrap().push(err.clone()));
        Self {
            host,
            seen,
            _dir: dir,
        }
    }

    async fn call(&self, channel: &str, args: Vec<Value>) -> Envelope<Value> {
        self.host
            .router()
            .handle(CallRequest::call(channel, args))
            .await
    }

    fn dispatched(&self) -> Vec<ClassifiedError> {
        self.seen.lock().unwrap().clone()
    }
}

#[tokio::test]
async fn reading_a_missing_file() {
    let h = Harness::new();
    let env = h.call("file:read", vec![json!("/nope.txt")]).await;

    assert!(env.is_error());
    assert_eq!(env.error_message(), Some("文件不存在: /nope.txt"));
    assert_eq!(env.error_code(), Some("E_FILE_NOT_FOUND"));

    let seen = h.dispatched();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn minimizing_without_a_window() {
    let h = Harness::with_window(HeadlessWindow::without_window());
    let env = h.call("window:minimize", vec![]).await;

    assert_eq!(env.error_message(), Some("窗口最小化失败: 主窗口不存在"));
    assert_eq!(env.error_code(), Some("E_SYSTEM_ERROR"));
    assert_eq!(h.dispatched()[0].kind, ErrorKind::System);
}

#[tokio::test]
async fn bad_path_is_rejected_before_touching_disk() {
    let h = Harness::new();
    let env = h.call("file:write", vec![json!(""), json!("data")]).await;
    assert_eq!(env.error_message(), Some("文件路径参数无效"));
    assert_eq!(env.error_code(), Some("E_INVALID_PARAMS"));
}

#[tokio::test]
async fn file_write_then_read() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a").join("b").join("note.txt");
    let path = path.to_string_lossy().into_owned();

    let env = h
        .call("file:write", vec![json!(path), json!("hello")])
        .await;
    assert!(env.is_success(), "{env:?}");

    let env = h.call("file:read", vec![json!(path)]).await;
    assert_eq!(env.data(), Some(&json!("hello")));

    let env = h.call("file:exists", vec![json!(path)]).await;
    assert_eq!(env.data(), Some(&json!(true)));

    let env = h.call("file:get-info", vec![json!(path)]).await;
    let info = env.data().unwrap();
    assert_eq!(info["name"], "note.txt");
    assert_eq!(info["type"], "txt");
    assert_eq!(info["size"], 5);
    assert_eq!(info["isDirectory"], false);

    let env = h.call("file:delete", vec![json!(path)]).await;
    assert!(env.is_success());
    let env = h.call("file:exists", vec![json!(path)]).await;
    assert_eq!(env.data(), Some(&json!(false)));
    assert!(h.dispatched().is_empty());
}

#[tokio::test]
async fn listing_a_missing_directory() {
    let h = Harness::new();
    let env = h.call("file:list-dir", vec![json!("/definitely/not/here")]).await;
    assert_eq!(env.error_code(), Some("E_DIRECTORY_NOT_FOUND"));
}

#[tokio::test]
async fn unknown_and_unrouted_channels() {
    let h = Harness::new();

    let env = h.call("window:teleport", vec![]).await;
    assert_eq!(env.error_code(), Some("E_NOT_IMPLEMENTED"));
    assert_eq!(env.error_message(), Some("未注册的IPC通道: window:teleport"));

    let env = h.call("update:check", vec![]).await;
    assert_eq!(env.error_code(), Some("E_NOT_IMPLEMENTED"));
    assert!(!h.host.router().is_routed(Channel::UpdateCheck));

    assert_eq!(h.dispatched().len(), 2);
}

#[tokio::test]
async fn collaborator_features_default_to_not_implemented() {
    let h = Harness::new();
    let env = h.call("usb:get-devices", vec![]).await;
    assert_eq!(env.error_code(), Some("E_NOT_IMPLEMENTED"));

    // Validation happens before the collaborator is asked.
    let env = h.call("usb:verify-device", vec![json!("")]).await;
    assert_eq!(env.error_code(), Some("E_INVALID_PARAMS"));
}

#[tokio::test]
async fn config_set_and_reset_publish_changes() {
    let h = Harness::new();
    let mut events = h.host.events().subscribe();

    let env = h.call("config:set", vec![json!({"theme": "dark"})]).await;
    assert_eq!(env.data().unwrap()["theme"], "dark");

    let event = events.recv().await.unwrap();
    assert_eq!(event.channel, Channel::ConfigChanged);
    assert_eq!(event.payload["theme"], "dark");

    let env = h.call("config:get", vec![]).await;
    assert_eq!(env.data().unwrap()["theme"], "dark");

    let env = h.call("config:reset", vec![]).await;
    assert_eq!(env.data().unwrap()["theme"], "light");
    assert_eq!(events.recv().await.unwrap().payload["theme"], "light");

    let env = h.call("config:set", vec![json!({"defaultVolume": "loud"})]).await;
    assert_eq!(env.error_code(), Some("E_PARAMS_TYPE_ERROR"));
}

#[tokio::test]
async fn panicking_listener_does_not_block_others() {
    let h = Harness::new();
    h.host.hub().add_listener(|_| panic!("listener bug"));
    let after = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&after);
    h.host
        .hub()
        .add_listener(move |_| *counter.lock().unwrap() += 1);

    let env = h.call("file:read", vec![json!("/nope.txt")]).await;
    assert!(env.is_error());
    assert_eq!(h.dispatched().len(), 1);
    assert_eq!(*after.lock().unwrap(), 1);
}

#[tokio::test]
async fn window_changes_are_announced() {
    let h = Harness::new();
    let mut events = h.host.events().subscribe();

    let env = h.call("window:maximize", vec![]).await;
    assert!(env.is_success());
    let event = events.recv().await.unwrap();
    assert_eq!(event.channel, Channel::WindowStateChanged);
    assert_eq!(event.payload["isMaximized"], true);

    let env = h
        .call(
            "window:set-bounds",
            vec![json!({"x": 10, "y": 20, "width": 640, "height": 480})],
        )
        .await;
    assert!(env.is_success());
    let env = h.call("window:get-state", vec![]).await;
    assert_eq!(env.data().unwrap()["bounds"]["width"], 640);
}

#[tokio::test]
async fn log_path_and_write() {
    let h = Harness::new();
    let env = h.call("log:get-path", vec![]).await;
    let path = env.data().unwrap().as_str().unwrap().to_string();
    assert!(path.ends_with("logs"));

    let env = h
        .call("log:write", vec![json!({"level": "info", "message": "hello"})])
        .await;
    assert!(env.is_success());

    let env = h.call("log:write", vec![json!({"level": "loud"})]).await;
    assert_eq!(env.error_code(), Some("E_PARAMS_TYPE_ERROR"));
}

#[cfg(unix)]
#[tokio::test]
async fn served_over_a_socket() {
    use hostcall_transport::{SocketTransport, Transport};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host.sock");
    let host = Arc::new(Host::headless().unwrap());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server_host = Arc::clone(&host);
    let server_path = path.clone();
    let server = tokio::spawn(async move {
        server_host
            .serve(&server_path, async {
                let _ = stop_rx.await;
            })
            .await
    });

    let mut transport = None;
    for _ in 0..50 {
        if let Ok(t) = SocketTransport::connect(&path).await {
            transport = Some(t);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let transport = transport.expect("server did not come up");

    let raw = transport
        .call(CallRequest::call("system:app-version", vec![]))
        .await
        .unwrap();
    let env = Envelope::from_value(raw).unwrap();
    assert_eq!(env.data(), Some(&json!(host.config().app_version)));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}
