//! In-process bridge between a client and a host dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hostcall_protocol::{CallRequest, Envelope, ErrorCode, HostEvent};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error};

use crate::error::{Result, TransportError};
use crate::traits::{Dispatcher, Transport};

/// Runs each call as its own task on the current runtime and answers
/// through a oneshot channel.
pub struct LocalTransport {
    dispatcher: Arc<dyn Dispatcher>,
    events: Option<broadcast::Sender<HostEvent>>,
    open: AtomicBool,
}

impl LocalTransport {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            dispatcher,
            events: None,
            open: AtomicBool::new(true),
        }
    }

    /// Forward events published on `events` to subscribers of this transport.
    pub fn with_events(mut self, events: broadcast::Sender<HostEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Mark the bridge unavailable. Calls already in flight still complete.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn is_available(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    async fn call(&self, request: CallRequest) -> Result<Value> {
        if !self.is_available() {
            return Err(TransportError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        let dispatcher = Arc::clone(&self.dispatcher);
        let request_id = request.request_id.clone();
        tokio::spawn(async move {
            let envelope = dispatcher.dispatch(request).await;
            if tx.send(encode_envelope(&envelope, &request_id)).is_err() {
                debug!(%request_id, "caller gone; discarding late response");
            }
        });

        rx.await.map_err(|_| TransportError::Closed)?
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<HostEvent>> {
        self.events.as_ref().map(broadcast::Sender::subscribe)
    }
}

/// The envelope as JSON, or an internal-error envelope when it cannot be
/// encoded.
pub(crate) fn encode_envelope(envelope: &Envelope<Value>, request_id: &str) -> Result<Value> {
    match envelope.to_value() {
        Ok(value) => Ok(value),
        Err(err) => {
            error!(%request_id, error = %err, "response envelope not encodable");
            let fallback: Envelope<Value> = Envelope::err(
                format!("{}: {err}", ErrorCode::InternalError.message()),
                Some(ErrorCode::InternalError),
            );
            serde_json::to_value(&fallback).map_err(TransportError::Json)
        }
    }
}
