use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use hostcall_protocol::{CallRequest, Channel, ClassifiedError, Envelope, ErrorCode, ErrorKind};
use hostcall_transport::Dispatcher;
use serde_json::Value;
use tracing::{debug, debug_span, Instrument};

use crate::hub::ErrorHub;
use crate::wrap::{reject, Args, Handler};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("'{0}' is an event channel and cannot take calls")]
    EventChannel(Channel),

    #[error("channel '{0}' already has a handler")]
    Duplicate(Channel),
}

/// Maps invoke channels to wrapped handlers.
pub struct Router {
    hub: Arc<ErrorHub>,
    routes: HashMap<Channel, Handler>,
}

impl Router {
    pub fn new(hub: Arc<ErrorHub>) -> Self {
        Self {
            hub,
            routes: HashMap::new(),
        }
    }

    pub fn hub(&self) -> &Arc<ErrorHub> {
        &self.hub
    }

    pub fn register(&mut self, channel: Channel, handler: Handler) -> Result<(), RouterError> {
        if channel.is_event() {
            return Err(RouterError::EventChannel(channel));
        }
        if self.routes.contains_key(&channel) {
            return Err(RouterError::Duplicate(channel));
        }
        self.routes.insert(channel, handler);
        Ok(())
    }

    pub fn is_routed(&self, channel: Channel) -> bool {
        self.routes.contains_key(&channel)
    }

    /// Routed channels in registry order.
    pub fn routed_channels(&self) -> Vec<Channel> {
        Channel::ALL
            .iter()
            .copied()
            .filter(|channel| self.routes.contains_key(channel))
            .collect()
    }

    /// Answer one call. Never fails: unknown or unrouted channels yield an
    /// error envelope that has also been dispatched to the hub.
    pub async fn handle(&self, request: CallRequest) -> Envelope<Value> {
        let Some(payload) = request.data else {
            let err = ClassifiedError::new(
                ErrorKind::InvalidParams,
                ErrorCode::MissingParams,
                "IPC请求缺少调用数据",
            )
            .with_detail("requestId", request.request_id);
            return reject(&self.hub, err);
        };

        let span = debug_span!(
            "ipc_call",
            request_id = %request.request_id,
            channel = %payload.channel
        );
        async move {
            debug!(args = payload.args.len(), "received request");
            let handler = Channel::parse(&payload.channel).and_then(|c| self.routes.get(&c));
            match handler {
                Some(handler) => handler(Args::new(payload.args)).await,
                None => {
                    let err = ClassifiedError::new(
                        ErrorKind::System,
                        ErrorCode::NotImplemented,
                        format!("未注册的IPC通道: {}", payload.channel),
                    );
                    reject(&self.hub, err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl Dispatcher for Router {
    async fn dispatch(&self, request: CallRequest) -> Envelope<Value> {
        self.handle(request).await
    }
}
