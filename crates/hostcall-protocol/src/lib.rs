//! Typed IPC protocol shared by the host and its untrusted clients.
//!
//! Every exchange is one of two shapes:
//! - an invoke call on a registered [`Channel`], carried in an
//!   [`IpcRequest`], answered by exactly one [`Envelope`];
//! - a one-way [`HostEvent`] on an event channel.
//!
//! Failures are described by a [`ClassifiedError`] (coarse [`ErrorKind`] plus
//! stable [`ErrorCode`]) and cross the boundary as the envelope's
//! `error`/`errorCode` pair.

pub mod channel;
pub mod classified;
pub mod clock;
pub mod code;
pub mod envelope;
pub mod error;
pub mod event;
pub mod request;
pub mod types;

pub use channel::{
    channel_group, identifier, is_valid_channel, Channel, ChannelKind, Domain, UnknownChannel,
    PROTOCOL_VERSION, SEPARATOR, SUPPORTED_FEATURES,
};
pub use classified::{classify, ClassifiedError};
pub use clock::now_millis;
pub use code::{message_for, ErrorCode, ErrorKind, UnknownCode, FALLBACK_MESSAGE};
pub use envelope::{Envelope, Outcome, RemoteFailure, WireEnvelope};
pub use error::{ProtocolError, Result};
pub use event::HostEvent;
pub use request::{new_request_id, CallPayload, CallRequest, IpcRequest};
