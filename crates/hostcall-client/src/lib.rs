//! Client invocation layer for hostcall.
//!
//! [`Client::invoke`] checks the transport, races the call against the
//! request timeout and validates the envelope. [`Client::safe_invoke`]
//! folds every outcome into an [`Envelope`](hostcall_protocol::Envelope),
//! and [`Client::batch_invoke`] runs independent calls concurrently.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use hostcall_client::Client;
//! use hostcall_transport::SocketTransport;
//!
//! let transport = SocketTransport::connect("/tmp/hostcall.sock").await?;
//! let client = Client::new(Arc::new(transport));
//! let info = client.system_info().await?;
//! println!("{} {}", info.platform, info.arch);
//! # Ok(())
//! # }
//! ```

mod api;
pub mod client;
pub mod config;
pub mod error;

pub use client::{BatchCall, Client, ClientStatus};
pub use config::{ClientConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ClientError, Result};
