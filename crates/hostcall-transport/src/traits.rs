use async_trait::async_trait;
use hostcall_protocol::{CallRequest, Envelope, HostEvent};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;

/// Client-side view of a connection to the host.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether calls can currently be made. A client checks this before
    /// every call.
    fn is_available(&self) -> bool;

    /// Send one invoke call and wait for the raw envelope JSON.
    ///
    /// Dropping the returned future abandons the call; a response that
    /// arrives afterwards is discarded.
    async fn call(&self, request: CallRequest) -> Result<Value>;

    /// Subscribe to host events, if this transport carries them.
    fn subscribe(&self) -> Option<broadcast::Receiver<HostEvent>> {
        None
    }
}

/// Host-side entry point: answers every call with exactly one envelope.
#[async_trait]
pub trait Dispatcher: Send + Sync + 'static {
    async fn dispatch(&self, request: CallRequest) -> Envelope<Value>;
}
