//! Built-in handlers for the surfaced channel namespace.
//!
//! `update:*` has no handlers on purpose: those channels stay unrouted and
//! answer `E_NOT_IMPLEMENTED` through the router.

use std::path::PathBuf;
use std::sync::Arc;

use crate::events::EventBus;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};

pub mod config;
pub mod file;
pub mod log;
pub mod media;
pub mod system;
pub mod window;

pub use config::ConfigStore;
pub use file::FileDialogs;
pub use media::{AuthService, Unsupported, UsbCapacity, UsbService, VideoService};
pub use system::SystemProbe;
pub use window::{HeadlessWindow, WindowError, WindowTarget};

/// Collaborators behind the built-in handlers.
pub struct Services {
    pub window: Arc<dyn WindowTarget>,
    pub system: Arc<SystemProbe>,
    pub dialogs: Option<Arc<dyn FileDialogs>>,
    pub config: Arc<ConfigStore>,
    pub log_dir: PathBuf,
    pub video: Arc<dyn VideoService>,
    pub usb: Arc<dyn UsbService>,
    pub auth: Arc<dyn AuthService>,
}

impl Services {
    pub(crate) fn register_all(
        self,
        router: &mut Router,
        hub: &Arc<ErrorHub>,
        events: &EventBus,
    ) -> Result<(), RouterError> {
        window::register(router, hub, self.window, events.clone())?;
        system::register(router, hub, self.system)?;
        file::register(router, hub, self.dialogs)?;
        config::register(router, hub, self.config, events.clone())?;
        log::register(router, hub, self.log_dir)?;
        media::register_video(router, hub, self.video, events.clone())?;
        media::register_usb(router, hub, self.usb)?;
        media::register_auth(router, hub, self.auth)?;
        Ok(())
    }
}
