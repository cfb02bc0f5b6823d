//! Host side of hostcall.
//!
//! Handlers are plain functions over [`Args`] returning `Result<R, Fault>`.
//! [`wrap`] and [`wrap_sync`] turn them into routed [`Handler`]s that always
//! answer with an envelope, sending every failure through the shared
//! [`ErrorHub`] once. [`Host`] assembles the hub, the [`EventBus`], the
//! [`Router`] and the built-in services.
//!
//! ```no_run
//! # async fn run() -> Result<(), hostcall_host::HostError> {
//! use hostcall_host::Host;
//!
//! let host = Host::headless()?;
//! host.hub().add_listener(|err| eprintln!("{err}"));
//! host.serve("/tmp/hostcall.sock", async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod fault;
pub mod host;
pub mod hub;
pub mod router;
pub mod services;
pub mod wrap;

pub use events::{EventBus, DEFAULT_EVENT_CAPACITY};
pub use fault::Fault;
pub use host::{Host, HostBuilder, HostConfig, HostError};
pub use hub::{ErrorHub, ListenerId};
pub use router::{Router, RouterError};
pub use wrap::{reject, wrap, wrap_sync, Args, Handler};
