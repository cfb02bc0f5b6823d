//! `window:*` handlers over a [`WindowTarget`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hostcall_protocol::types::{Bounds, WindowState};
use hostcall_protocol::{Channel, ErrorCode, ErrorKind};
use tracing::info;

use crate::events::EventBus;
use crate::fault::Fault;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::wrap::{wrap_sync, Args};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("主窗口不存在")]
    NoWindow,

    #[error("{0}")]
    Platform(String),
}

/// The main application window, as the host sees it.
pub trait WindowTarget: Send + Sync {
    fn minimize(&self) -> Result<(), WindowError>;
    /// Maximize, or restore if already maximized.
    fn toggle_maximize(&self) -> Result<(), WindowError>;
    fn close(&self) -> Result<(), WindowError>;
    fn hide(&self) -> Result<(), WindowError>;
    fn show(&self) -> Result<(), WindowError>;
    fn state(&self) -> Result<WindowState, WindowError>;
    fn set_bounds(&self, bounds: Bounds) -> Result<(), WindowError>;
}

/// Virtual window state for hosts without a display.
#[derive(Debug)]
pub struct HeadlessWindow {
    state: Mutex<Option<WindowState>>,
}

impl Default for HeadlessWindow {
    fn default() -> Self {
        Self::new(Bounds {
            x: 0,
            y: 0,
            width: 1280,
            height: 800,
        })
    }
}

impl HeadlessWindow {
    /// An open, visible window with the given bounds.
    pub fn new(bounds: Bounds) -> Self {
        Self {
            state: Mutex::new(Some(WindowState {
                is_visible: true,
                bounds,
                ..WindowState::default()
            })),
        }
    }

    /// A host whose main window has not been created (or is gone).
    pub fn without_window() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    fn state_mut(&self) -> MutexGuard<'_, Option<WindowState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut WindowState)) -> Result<(), WindowError> {
        let mut guard = self.state_mut();
        let state = guard.as_mut().ok_or(WindowError::NoWindow)?;
        f(state);
        Ok(())
    }
}

impl WindowTarget for HeadlessWindow {
    fn minimize(&self) -> Result<(), WindowError> {
        self.update(|s| s.is_minimized = true)
    }

    fn toggle_maximize(&self) -> Result<(), WindowError> {
        self.update(|s| {
            s.is_maximized = !s.is_maximized;
            s.is_minimized = false;
        })
    }

    fn close(&self) -> Result<(), WindowError> {
        let mut guard = self.state_mut();
        guard.take().map(|_| ()).ok_or(WindowError::NoWindow)
    }

    fn hide(&self) -> Result<(), WindowError> {
        self.update(|s| s.is_visible = false)
    }

    fn show(&self) -> Result<(), WindowError> {
        self.update(|s| {
            s.is_visible = true;
            s.is_minimized = false;
        })
    }

    fn state(&self) -> Result<WindowState, WindowError> {
        (*self.state_mut()).ok_or(WindowError::NoWindow)
    }

    fn set_bounds(&self, bounds: Bounds) -> Result<(), WindowError> {
        self.update(|s| s.bounds = bounds)
    }
}

fn window_fault(action: &str, err: WindowError) -> Fault {
    Fault::new(
        ErrorKind::System,
        ErrorCode::SystemError,
        format!("{action}失败: {err}"),
    )
}

fn announce(target: &dyn WindowTarget, events: &EventBus) {
    if let Ok(state) = target.state() {
        events.publish(Channel::WindowStateChanged, &state);
    }
}

type Op = fn(&dyn WindowTarget) -> Result<(), WindowError>;

pub(crate) fn register(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    target: Arc<dyn WindowTarget>,
    events: EventBus,
) -> Result<(), RouterError> {
    let simple: [(Channel, &'static str, Op); 5] = [
        (Channel::WindowMinimize, "窗口最小化", |t| t.minimize()),
        (Channel::WindowMaximize, "窗口最大化", |t| t.toggle_maximize()),
        (Channel::WindowClose, "窗口关闭", |t| t.close()),
        (Channel::WindowHide, "窗口隐藏", |t| t.hide()),
        (Channel::WindowShow, "窗口显示", |t| t.show()),
    ];
    for (channel, action, op) in simple {
        let target = Arc::clone(&target);
        let events = events.clone();
        let handler = wrap_sync(Arc::clone(hub), move |_args| {
            op(target.as_ref()).map_err(|err| window_fault(action, err))?;
            info!(%channel, "window operation applied");
            announce(target.as_ref(), &events);
            Ok(())
        });
        router.register(channel, handler)?;
    }

    let state_target = Arc::clone(&target);
    router.register(
        Channel::WindowGetState,
        wrap_sync(Arc::clone(hub), move |_args| {
            state_target
                .state()
                .map_err(|err| window_fault("获取窗口状态", err))
        }),
    )?;

    router.register(
        Channel::WindowSetBounds,
        wrap_sync(Arc::clone(hub), move |args: Args| {
            let bounds: Bounds = args.required(0)?;
            target
                .set_bounds(bounds)
                .map_err(|err| window_fault("设置窗口位置", err))?;
            announce(target.as_ref(), &events);
            Ok(())
        }),
    )?;

    Ok(())
}
