//! Transport layer for hostcall.
//!
//! Two seams meet here:
//! - [`Transport`] is what a client calls through;
//! - [`Dispatcher`] is what a host answers with.
//!
//! [`LocalTransport`] connects the two inside one process. On Unix,
//! [`SocketServer`] and [`SocketTransport`] connect them across processes
//! using the length-prefixed frame format in [`codec`].

pub mod codec;
pub mod error;
pub mod local;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use codec::{CodecConfig, Frame, FrameCodec, FrameKind, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{Result, TransportError};
pub use local::LocalTransport;
pub use traits::{Dispatcher, Transport};

#[cfg(unix)]
pub use uds::{SocketServer, SocketTransport};
