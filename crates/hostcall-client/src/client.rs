//! The invocation path: availability check, timeout race, envelope
//! validation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::future::join_all;
use hostcall_protocol::{
    CallRequest, Channel, Envelope, HostEvent, Outcome, ProtocolError, RemoteFailure,
    PROTOCOL_VERSION,
};
use hostcall_transport::Transport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// One entry of a [`Client::batch_invoke`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCall {
    /// Key of this call's result in the returned map.
    pub key: String,
    pub channel: String,
    pub args: Vec<Value>,
}

impl BatchCall {
    pub fn new(key: impl Into<String>, channel: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            key: key.into(),
            channel: channel.into(),
            args,
        }
    }
}

/// Snapshot returned by [`Client::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    pub is_available: bool,
    pub timeout_ms: u64,
    pub version: String,
}

/// Typed, timeout-bounded calls over a [`Transport`].
///
/// Cheap to clone; clones share the transport and the timeout setting.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    timeout: Arc<RwLock<Duration>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("request_timeout", &self.request_timeout())
            .field("available", &self.transport.is_available())
            .finish()
    }
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            timeout: Arc::new(RwLock::new(config.request_timeout)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        *self
            .timeout
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Applies to calls started after this returns.
    pub fn set_request_timeout(&self, timeout: Duration) {
        *self
            .timeout
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = timeout;
    }

    pub fn is_available(&self) -> bool {
        self.transport.is_available()
    }

    /// Call `channel` and return its data.
    ///
    /// The call races the request timeout; when the timeout wins the call is
    /// abandoned and a late response is discarded by the transport.
    pub async fn invoke<T: DeserializeOwned>(&self, channel: &str, args: Vec<Value>) -> Result<T> {
        let result = self.invoke_raw(channel, args).await;
        if let Err(err) = &result {
            debug!(channel, code = %err.code(), error = %err, "ipc call failed");
        }
        let value = result?;
        serde_json::from_value(value).map_err(ClientError::Decode)
    }

    async fn invoke_raw(&self, channel: &str, args: Vec<Value>) -> Result<Value> {
        if !self.transport.is_available() {
            return Err(ClientError::Unavailable);
        }

        let timeout = self.request_timeout();
        let request = CallRequest::call(channel, args);
        debug!(channel, request_id = %request.request_id, "ipc call");

        let raw = match tokio::time::timeout(timeout, self.transport.call(request)).await {
            Ok(raw) => raw?,
            Err(_) => {
                warn!(channel, timeout_ms = timeout.as_millis() as u64, "ipc call timed out");
                return Err(ClientError::Timeout {
                    channel: channel.to_string(),
                    after: timeout,
                });
            }
        };

        match Envelope::from_value(raw) {
            Ok(envelope) => match envelope.outcome {
                Outcome::Success(data) => Ok(data),
                Outcome::Failure { error, error_code } => {
                    Err(RemoteFailure::new(error, error_code).into())
                }
            },
            Err(ProtocolError::MissingData) => Err(ClientError::EmptyData {
                channel: channel.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Like [`invoke`](Self::invoke), but never fails: the outcome is a
    /// fresh local envelope.
    ///
    /// A remote failure keeps the host's `error` and `errorCode`; anything
    /// else carries the client-side classification.
    pub async fn safe_invoke<T: DeserializeOwned>(
        &self,
        channel: &str,
        args: Vec<Value>,
    ) -> Envelope<T> {
        match self.invoke(channel, args).await {
            Ok(data) => Envelope::ok(data),
            Err(ClientError::Remote { message, code }) => {
                Envelope::from_failure(RemoteFailure::new(message, code))
            }
            Err(other) => Envelope::from(other.to_classified()),
        }
    }

    /// Run `calls` concurrently. Successful results are keyed by
    /// [`BatchCall::key`]; failed calls are logged and left out.
    pub async fn batch_invoke(&self, calls: Vec<BatchCall>) -> HashMap<String, Value> {
        let pending = calls.into_iter().map(|call| async move {
            let result = self.invoke::<Value>(&call.channel, call.args).await;
            (call.key, call.channel, result)
        });

        let mut results = HashMap::new();
        for (key, channel, result) in join_all(pending).await {
            match result {
                Ok(value) => {
                    results.insert(key, value);
                }
                Err(err) => {
                    warn!(%key, %channel, code = %err.code(), error = %err, "batch ipc call failed");
                }
            }
        }
        results
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            is_available: self.transport.is_available(),
            timeout_ms: self.request_timeout().as_millis() as u64,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Whether the host answers `system:info`.
    pub async fn test_connection(&self) -> bool {
        self.invoke::<Value>(Channel::SystemInfo.as_str(), Vec::new())
            .await
            .is_ok()
    }

    /// Host events, when the transport carries them.
    pub fn events(&self) -> Option<broadcast::Receiver<HostEvent>> {
        self.transport.subscribe()
    }
}
