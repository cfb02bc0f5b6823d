use hostcall_protocol::{Channel, HostEvent};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Host-local publisher for one-way notifications on event channels.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish `payload` on `channel`. Returns the number of subscribers
    /// reached; invoke channels and unserializable payloads reach nobody.
    pub fn publish<T: Serialize>(&self, channel: Channel, payload: &T) -> usize {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(%channel, error = %err, "unserializable event payload");
                return 0;
            }
        };
        let Some(event) = HostEvent::new(channel, payload) else {
            warn!(%channel, "refusing to publish on an invoke channel");
            return 0;
        };
        match self.tx.send(event) {
            Ok(reached) => reached,
            Err(_) => {
                debug!(%channel, "event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    /// The underlying sender, for handing to a transport.
    pub fn sender(&self) -> broadcast::Sender<HostEvent> {
        self.tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        assert_eq!(bus.publish(Channel::ConfigChanged, &json!({"theme": "dark"})), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel, Channel::ConfigChanged);
        assert_eq!(event.payload["theme"], "dark");
    }

    #[test]
    fn invoke_channels_are_refused() {
        let bus = EventBus::default();
        let _rx = bus.subscribe();
        assert_eq!(bus.publish(Channel::ConfigSet, &json!({})), 0);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(Channel::UsbDeviceAdded, &json!(null)), 0);
    }
}
