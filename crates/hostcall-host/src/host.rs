//! Host assembly: the hub, event bus, router and built-in services in one
//! handle.

use std::path::PathBuf;
use std::sync::Arc;

use hostcall_transport::{Dispatcher, LocalTransport};
use tracing::info;

use crate::events::{EventBus, DEFAULT_EVENT_CAPACITY};
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::services::{
    AuthService, ConfigStore, FileDialogs, HeadlessWindow, Services, SystemProbe, Unsupported,
    UsbService, VideoService, WindowTarget,
};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Transport(#[from] hostcall_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Host settings.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub app_name: String,
    /// Reported on `system:app-version`.
    pub app_version: String,
    /// JSON file backing `config:*`. `None` keeps configuration in memory.
    pub config_path: Option<PathBuf>,
    /// Directory reported on `log:get-path` and swept by `log:clean`.
    pub log_dir: PathBuf,
    pub event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            app_name: "hostcall".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            config_path: None,
            log_dir: std::env::temp_dir().join("hostcall").join("logs"),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Builder for [`Host`]. Collaborators left unset fall back to
/// [`HeadlessWindow`], no file dialogs and [`Unsupported`].
pub struct HostBuilder {
    config: HostConfig,
    hub: Option<Arc<ErrorHub>>,
    window: Option<Arc<dyn WindowTarget>>,
    dialogs: Option<Arc<dyn FileDialogs>>,
    video: Option<Arc<dyn VideoService>>,
    usb: Option<Arc<dyn UsbService>>,
    auth: Option<Arc<dyn AuthService>>,
}

impl HostBuilder {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            hub: None,
            window: None,
            dialogs: None,
            video: None,
            usb: None,
            auth: None,
        }
    }

    /// Share an existing hub instead of creating one.
    pub fn hub(mut self, hub: Arc<ErrorHub>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn window(mut self, window: Arc<dyn WindowTarget>) -> Self {
        self.window = Some(window);
        self
    }

    pub fn dialogs(mut self, dialogs: Arc<dyn FileDialogs>) -> Self {
        self.dialogs = Some(dialogs);
        self
    }

    pub fn video(mut self, video: Arc<dyn VideoService>) -> Self {
        self.video = Some(video);
        self
    }

    pub fn usb(mut self, usb: Arc<dyn UsbService>) -> Self {
        self.usb = Some(usb);
        self
    }

    pub fn auth(mut self, auth: Arc<dyn AuthService>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn build(self) -> Result<Host> {
        let hub = self.hub.unwrap_or_default();
        let events = EventBus::new(self.config.event_capacity);
        let config_store = match &self.config.config_path {
            Some(path) => ConfigStore::open(path),
            None => ConfigStore::in_memory(),
        };

        let services = Services {
            window: self
                .window
                .unwrap_or_else(|| Arc::new(HeadlessWindow::default())),
            system: Arc::new(SystemProbe::new(self.config.app_version.clone())),
            dialogs: self.dialogs,
            config: Arc::new(config_store),
            log_dir: self.config.log_dir.clone(),
            video: self.video.unwrap_or_else(|| Arc::new(Unsupported)),
            usb: self.usb.unwrap_or_else(|| Arc::new(Unsupported)),
            auth: self.auth.unwrap_or_else(|| Arc::new(Unsupported)),
        };

        let mut router = Router::new(Arc::clone(&hub));
        services.register_all(&mut router, &hub, &events)?;
        info!(
            app = %self.config.app_name,
            routes = router.routed_channels().len(),
            "host ready"
        );

        Ok(Host {
            config: self.config,
            hub,
            events,
            router: Arc::new(router),
        })
    }
}

/// A ready-to-serve host.
pub struct Host {
    config: HostConfig,
    hub: Arc<ErrorHub>,
    events: EventBus,
    router: Arc<Router>,
}

impl Host {
    pub fn builder(config: HostConfig) -> HostBuilder {
        HostBuilder::new(config)
    }

    /// A host with default settings and collaborators.
    pub fn headless() -> Result<Self> {
        HostBuilder::new(HostConfig::default()).build()
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<ErrorHub> {
        &self.hub
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        Arc::clone(&self.router) as Arc<dyn Dispatcher>
    }

    /// An in-process transport answering from this host.
    pub fn local_transport(&self) -> LocalTransport {
        LocalTransport::new(self.dispatcher()).with_events(self.events.sender())
    }

    /// Serve this host on a Unix socket at `path` until `shutdown` resolves.
    #[cfg(unix)]
    pub async fn serve<F>(&self, path: impl AsRef<std::path::Path>, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let server = hostcall_transport::SocketServer::bind(path)?;
        info!(path = %server.path().display(), "serving");
        server
            .serve(self.dispatcher(), Some(self.events.sender()), shutdown)
            .await?;
        Ok(())
    }
}
