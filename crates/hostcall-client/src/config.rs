use std::time::Duration;

/// Default bound on a single invoke call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long `invoke` waits for the host before giving up.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
