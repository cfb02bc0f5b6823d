use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::Channel;
use crate::clock::now_millis;

/// A one-way notification published by the host on an event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    pub channel: Channel,
    #[serde(default)]
    pub payload: Value,
    pub timestamp: u64,
}

impl HostEvent {
    /// `None` when `channel` is an invoke channel.
    pub fn new(channel: Channel, payload: Value) -> Option<Self> {
        channel.is_event().then(|| Self {
            channel,
            payload,
            timestamp: now_millis(),
        })
    }
}
