use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::now_millis;

/// Request wrapper carried by every transported call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpcRequest<T = Value> {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: u64,
}

impl<T> IpcRequest<T> {
    pub fn new(data: T) -> Self {
        Self {
            request_id: new_request_id(),
            data: Some(data),
            timestamp: now_millis(),
        }
    }

    pub fn empty() -> Self {
        Self {
            request_id: new_request_id(),
            data: None,
            timestamp: now_millis(),
        }
    }
}

/// `req_` followed by a random v4 UUID in simple form.
pub fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().simple())
}

/// Payload of an invoke call: the channel identifier and positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    pub channel: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A transported invoke call.
pub type CallRequest = IpcRequest<CallPayload>;

impl CallRequest {
    pub fn call(channel: impl Into<String>, args: Vec<Value>) -> Self {
        IpcRequest::new(CallPayload {
            channel: channel.into(),
            args,
        })
    }

    pub fn channel(&self) -> Option<&str> {
        self.data.as_ref().map(|p| p.channel.as_str())
    }
}
