//! Framed Unix domain socket transport.
//!
//! [`SocketServer`] accepts connections on a filesystem path and answers
//! request frames through a [`Dispatcher`]. [`SocketTransport`] is the client
//! end: it pairs responses with callers by the frame call id, so requests on
//! one connection may complete in any order.

use std::collections::HashMap;
use std::future::Future;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use hostcall_protocol::{CallRequest, Envelope, ErrorCode, HostEvent};
use serde_json::Value;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{CodecConfig, Frame, FrameCodec, FrameKind};
use crate::error::{Result, TransportError};
use crate::traits::{Dispatcher, Transport};

const OUTGOING_QUEUE: usize = 64;
const EVENT_BUFFER: usize = 64;

type Pending = Mutex<HashMap<u64, oneshot::Sender<Value>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Aborts a spawned task when dropped.
struct TaskGuard(AbortHandle);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Host end of the socket transport.
pub struct SocketServer {
    listener: UnixListener,
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
    codec: CodecConfig,
}

impl SocketServer {
    /// Default permission mode for created socket paths.
    pub const DEFAULT_SOCKET_MODE: u32 = 0o600;
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind and listen on a filesystem-path Unix domain socket.
    ///
    /// If the path already exists and is a socket, it is removed first.
    /// Must be called from within a tokio runtime.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_SOCKET_MODE)
    }

    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bind_err = |path: &Path, source| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        };

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        // Remove a stale socket, but never a non-socket file.
        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(
                    &path,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "existing path is not a unix socket",
                    ),
                ));
            }
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| bind_err(&path, e))?;
        }

        let listener = UnixListener::bind(&path).map_err(|e| bind_err(&path, e))?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(|e| bind_err(&path, e))?;
        let created = std::fs::symlink_metadata(&path).map_err(|e| bind_err(&path, e))?;

        info!(?path, "listening on unix domain socket");

        Ok(Self {
            listener,
            path,
            created_inode: Some((created.dev(), created.ino())),
            codec: CodecConfig::default(),
        })
    }

    pub fn with_codec_config(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// The path this socket is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Every request frame is dispatched on its own task; responses are
    /// written in completion order. Events published on `events` are
    /// forwarded to every connected client. Open connections and their
    /// in-flight calls are aborted when this returns.
    pub async fn serve<F>(
        &self,
        dispatcher: Arc<dyn Dispatcher>,
        events: Option<broadcast::Sender<HostEvent>>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        // Dropping the set aborts every connection still being served.
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(
                        path = ?self.path,
                        open_connections = connections.len(),
                        "socket server shutting down"
                    );
                    connections.shutdown().await;
                    return Ok(());
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = self.listener.accept() => {
                    let (stream, _addr) = accepted.map_err(TransportError::Accept)?;
                    debug!("accepted connection");
                    let dispatcher = Arc::clone(&dispatcher);
                    let events = events.as_ref().map(broadcast::Sender::subscribe);
                    let codec = self.codec.clone();
                    connections.spawn(serve_connection(stream, dispatcher, events, codec));
                }
            }
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode else {
            return;
        };
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "cleaning up socket file");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(path = ?self.path, "socket path identity changed; skipping cleanup");
            }
        }
    }
}

async fn serve_connection(
    stream: UnixStream,
    dispatcher: Arc<dyn Dispatcher>,
    events: Option<broadcast::Receiver<HostEvent>>,
    codec: CodecConfig,
) {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, FrameCodec::new(&codec));
    let mut writer = FramedWrite::new(write_half, FrameCodec::new(&codec));
    let (tx, mut rx) = mpsc::channel::<Frame>(OUTGOING_QUEUE);

    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(err) = writer.send(frame).await {
                warn!(error = %err, "failed to write frame; closing connection");
                break;
            }
        }
    });
    let _writer_guard = TaskGuard(writer_task.abort_handle());

    // Dispatch tasks and the event forwarder die with the connection.
    let mut calls = JoinSet::new();
    let event_task = events.map(|events| tokio::spawn(forward_events(events, tx.clone())));
    let _event_guard = event_task.as_ref().map(|task| TaskGuard(task.abort_handle()));

    while let Some(frame) = reader.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "closing connection after frame error");
                break;
            }
        };
        if frame.kind != FrameKind::Request {
            warn!(kind = ?frame.kind, "ignoring unexpected frame from client");
            continue;
        }

        let call_id = frame.call_id;
        let tx = tx.clone();
        match frame.decode_json::<CallRequest>() {
            Ok(request) => {
                let dispatcher = Arc::clone(&dispatcher);
                calls.spawn(async move {
                    let envelope = dispatcher.dispatch(request).await;
                    send_response(&tx, call_id, &envelope).await;
                });
                while calls.try_join_next().is_some() {}
            }
            Err(err) => {
                warn!(call_id, error = %err, "undecodable request frame");
                let envelope: Envelope<Value> =
                    Envelope::err(format!("无效的IPC请求: {err}"), Some(ErrorCode::InvalidParams));
                send_response(&tx, call_id, &envelope).await;
            }
        }
    }

    debug!("connection closed by peer");
    if let Some(task) = event_task {
        task.abort();
    }
    drop(tx);
    // In-flight calls still hold senders; the writer drains them before exiting.
    while calls.join_next().await.is_some() {}
    let _ = writer_task.await;
}

async fn send_response(tx: &mpsc::Sender<Frame>, call_id: u64, envelope: &Envelope<Value>) {
    let frame = Frame::json(FrameKind::Response, call_id, envelope).or_else(|err| {
        error!(call_id, error = %err, "response envelope not encodable");
        let fallback: Envelope<Value> = Envelope::err(
            format!("{}: {err}", ErrorCode::InternalError.message()),
            Some(ErrorCode::InternalError),
        );
        Frame::json(FrameKind::Response, call_id, &fallback)
    });
    match frame {
        Ok(frame) => {
            if tx.send(frame).await.is_err() {
                debug!(call_id, "connection gone; dropping response");
            }
        }
        Err(err) => warn!(call_id, error = %err, "failed to encode response"),
    }
}

async fn forward_events(mut events: broadcast::Receiver<HostEvent>, tx: mpsc::Sender<Frame>) {
    loop {
        match events.recv().await {
            Ok(event) => match Frame::json(FrameKind::Event, 0, &event) {
                Ok(frame) => {
                    if tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(channel = %event.channel, error = %err, "failed to encode event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event forwarder lagged; events dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

impl SocketTransport {
    /// Reserve a response slot for `call_id`, unless the transport has closed.
    fn register(&self, call_id: u64) -> Result<oneshot::Receiver<Value>> {
        let mut pending = lock(&self.pending);
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let (tx, rx) = oneshot::channel();
        pending.insert(call_id, tx);
        Ok(rx)
    }
}

/// Client end of the socket transport.
pub struct SocketTransport {
    outgoing: mpsc::Sender<Frame>,
    pending: Arc<Pending>,
    next_call_id: AtomicU64,
    open: Arc<AtomicBool>,
    events: broadcast::Sender<HostEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl SocketTransport {
    /// Connect to a listening host socket.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_config(path, CodecConfig::default()).await
    }

    pub async fn connect_with_config(path: impl AsRef<Path>, codec: CodecConfig) -> Result<Self> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| TransportError::Connect {
                path: path.to_path_buf(),
                source: e,
            })?;
        debug!(?path, "connected to unix domain socket");

        let (read_half, write_half) = stream.into_split();
        let mut reader = FramedRead::new(read_half, FrameCodec::new(&codec));
        let mut writer = FramedWrite::new(write_half, FrameCodec::new(&codec));
        let (outgoing, mut rx) = mpsc::channel::<Frame>(OUTGOING_QUEUE);
        let pending: Arc<Pending> = Arc::new(Mutex::new(HashMap::new()));
        let open = Arc::new(AtomicBool::new(true));
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let write_pending = Arc::clone(&pending);
        let write_open = Arc::clone(&open);
        let writer_task = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(err) = writer.send(frame).await {
                    warn!(error = %err, "failed to write frame; transport unavailable");
                    break;
                }
            }
            // Frames still queued are never sent.
            shut(&write_open, &write_pending);
        });

        let read_pending = Arc::clone(&pending);
        let read_open = Arc::clone(&open);
        let read_events = events.clone();
        let reader_task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(frame) => route_incoming(frame, &read_pending, &read_events),
                    Err(err) => {
                        warn!(error = %err, "frame error from host");
                        break;
                    }
                }
            }
            debug!("host connection closed");
            shut(&read_open, &read_pending);
        });

        Ok(Self {
            outgoing,
            pending,
            next_call_id: AtomicU64::new(1),
            open,
            events,
            tasks: vec![writer_task, reader_task],
        })
    }
}

/// Mark the transport closed and wake every waiting caller with `Closed`.
///
/// Runs under the pending lock so no waiter is registered after the clear.
fn shut(open: &AtomicBool, pending: &Pending) {
    let mut pending = lock(pending);
    open.store(false, Ordering::Release);
    pending.clear();
}

fn route_incoming(frame: Frame, pending: &Pending, events: &broadcast::Sender<HostEvent>) {
    match frame.kind {
        FrameKind::Response => {
            let waiter = lock(pending).remove(&frame.call_id);
            let Some(waiter) = waiter else {
                debug!(call_id = frame.call_id, "discarding late response");
                return;
            };
            match frame.decode_json::<Value>() {
                Ok(value) => {
                    if waiter.send(value).is_err() {
                        debug!(call_id = frame.call_id, "caller gone; discarding response");
                    }
                }
                // Dropping the waiter reports the call as closed.
                Err(err) => warn!(call_id = frame.call_id, error = %err, "undecodable response"),
            }
        }
        FrameKind::Event => match frame.decode_json::<HostEvent>() {
            Ok(event) => {
                let _ = events.send(event);
            }
            Err(err) => warn!(error = %err, "undecodable event frame"),
        },
        FrameKind::Request => warn!("ignoring request frame from host"),
    }
}

struct PendingGuard<'a> {
    pending: &'a Pending,
    call_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.call_id);
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn is_available(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn call(&self, request: CallRequest) -> Result<Value> {
        let call_id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
        let frame = Frame::json(FrameKind::Request, call_id, &request)?;

        let rx = self.register(call_id)?;
        let _guard = PendingGuard {
            pending: &self.pending,
            call_id,
        };

        self.outgoing
            .send(frame)
            .await
            .map_err(|_| TransportError::Closed)?;
        rx.await.map_err(|_| TransportError::Closed)
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<HostEvent>> {
        Some(self.events.subscribe())
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
