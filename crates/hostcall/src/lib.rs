//! Typed request/response IPC between a privileged host and untrusted
//! clients.
//!
//! # Crate Structure
//!
//! - [`protocol`]: channel registry, error taxonomy, envelopes
//! - [`transport`]: transport seams, frame codec, Unix socket transport
//! - [`host`]: error hub, handler wrapping, router, built-in services
//! - [`client`]: timeout-bounded invocation layer

/// Re-export protocol types.
pub mod protocol {
    pub use hostcall_protocol::*;
}

/// Re-export transport types (requires `transport` feature).
#[cfg(feature = "transport")]
pub mod transport {
    pub use hostcall_transport::*;
}

/// Re-export host types (requires `host` feature).
#[cfg(feature = "host")]
pub mod host {
    pub use hostcall_host::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use hostcall_client::*;
}
