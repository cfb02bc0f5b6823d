//! `video:*`, `usb:*` and `auth:*` handlers.
//!
//! The work itself belongs to external collaborators. The handlers here own
//! argument validation and classification; the collaborator traits only see
//! well-formed requests.

use std::sync::Arc;

use async_trait::async_trait;
use hostcall_protocol::types::{
    PasswordVerifyRequest, SessionInfo, UsbDevice, VideoDecryptRequest, VideoEncryptRequest,
    VideoInfo,
};
use hostcall_protocol::{Channel, ErrorCode, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::EventBus;
use crate::fault::Fault;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::wrap::{wrap, Args};

/// Encrypted video processing. Long operations may publish
/// `video:process-progress` on `events`.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Returns the written output path.
    async fn encrypt(&self, request: VideoEncryptRequest, events: &EventBus)
        -> Result<String, Fault>;
    /// Returns the path of the decrypted playable file.
    async fn decrypt(&self, request: VideoDecryptRequest, events: &EventBus)
        -> Result<String, Fault>;
    async fn info(&self, path: &str) -> Result<VideoInfo, Fault>;
}

/// Space on a removable device, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsbCapacity {
    pub total: u64,
    pub free: u64,
}

#[async_trait]
pub trait UsbService: Send + Sync {
    async fn devices(&self) -> Result<Vec<UsbDevice>, Fault>;
    async fn verify(&self, device_id: &str) -> Result<bool, Fault>;
    async fn capacity(&self, device_id: &str) -> Result<UsbCapacity, Fault>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn verify_password(&self, request: PasswordVerifyRequest) -> Result<bool, Fault>;
    async fn create_session(&self) -> Result<SessionInfo, Fault>;
    async fn destroy_session(&self, session_id: &str) -> Result<(), Fault>;
    /// The given session, or the current one when `session_id` is `None`.
    async fn session(&self, session_id: Option<&str>) -> Result<Option<SessionInfo>, Fault>;
}

/// Stand-in for hosts that ship without these features.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

fn not_implemented(feature: &str) -> Fault {
    Fault::new(
        ErrorKind::System,
        ErrorCode::NotImplemented,
        format!("{feature}功能未实现"),
    )
}

#[async_trait]
impl VideoService for Unsupported {
    async fn encrypt(&self, _: VideoEncryptRequest, _: &EventBus) -> Result<String, Fault> {
        Err(not_implemented("视频加密"))
    }

    async fn decrypt(&self, _: VideoDecryptRequest, _: &EventBus) -> Result<String, Fault> {
        Err(not_implemented("视频解密"))
    }

    async fn info(&self, _: &str) -> Result<VideoInfo, Fault> {
        Err(not_implemented("视频信息"))
    }
}

#[async_trait]
impl UsbService for Unsupported {
    async fn devices(&self) -> Result<Vec<UsbDevice>, Fault> {
        Err(not_implemented("USB设备"))
    }

    async fn verify(&self, _: &str) -> Result<bool, Fault> {
        Err(not_implemented("USB设备验证"))
    }

    async fn capacity(&self, _: &str) -> Result<UsbCapacity, Fault> {
        Err(not_implemented("USB容量查询"))
    }
}

#[async_trait]
impl AuthService for Unsupported {
    async fn verify_password(&self, _: PasswordVerifyRequest) -> Result<bool, Fault> {
        Err(not_implemented("密码验证"))
    }

    async fn create_session(&self) -> Result<SessionInfo, Fault> {
        Err(not_implemented("会话"))
    }

    async fn destroy_session(&self, _: &str) -> Result<(), Fault> {
        Err(not_implemented("会话"))
    }

    async fn session(&self, _: Option<&str>) -> Result<Option<SessionInfo>, Fault> {
        Err(not_implemented("会话"))
    }
}

fn invalid(message: &str) -> Fault {
    Fault::new(ErrorKind::InvalidParams, ErrorCode::InvalidParams, message)
}

fn check_encrypt(request: &VideoEncryptRequest) -> Result<(), Fault> {
    if request.source_path.is_empty() || request.output_path.is_empty() {
        return Err(invalid("视频路径参数无效"));
    }
    if request.password.is_empty() {
        return Err(invalid("密码不能为空"));
    }
    if request.quality.is_some_and(|q| q > 100) {
        return Err(invalid("视频质量参数无效"));
    }
    Ok(())
}

fn check_decrypt(request: &VideoDecryptRequest) -> Result<(), Fault> {
    if request.encrypted_path.is_empty() {
        return Err(invalid("视频路径参数无效"));
    }
    if request.password.is_empty() {
        return Err(invalid("密码不能为空"));
    }
    Ok(())
}

fn required_id(args: &Args, what: &str) -> Result<String, Fault> {
    let id = args.required_str(0, what)?;
    if id.is_empty() {
        return Err(invalid(&format!("{what}参数无效")));
    }
    Ok(id)
}

pub(crate) fn register_video(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    video: Arc<dyn VideoService>,
    events: EventBus,
) -> Result<(), RouterError> {
    let (svc, bus) = (Arc::clone(&video), events.clone());
    router.register(
        Channel::VideoEncrypt,
        wrap(Arc::clone(hub), move |args: Args| {
            let (svc, bus) = (Arc::clone(&svc), bus.clone());
            async move {
                let request: VideoEncryptRequest = args.required(0)?;
                check_encrypt(&request)?;
                let output = svc.encrypt(request, &bus).await?;
                info!(%output, "video encrypted");
                Ok(output)
            }
        }),
    )?;

    let svc = Arc::clone(&video);
    router.register(
        Channel::VideoDecrypt,
        wrap(Arc::clone(hub), move |args: Args| {
            let (svc, bus) = (Arc::clone(&svc), events.clone());
            async move {
                let request: VideoDecryptRequest = args.required(0)?;
                check_decrypt(&request)?;
                svc.decrypt(request, &bus).await
            }
        }),
    )?;

    router.register(
        Channel::VideoGetInfo,
        wrap(Arc::clone(hub), move |args: Args| {
            let svc = Arc::clone(&video);
            async move {
                let path = args.required_path(0)?;
                svc.info(&path).await
            }
        }),
    )?;
    Ok(())
}

pub(crate) fn register_usb(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    usb: Arc<dyn UsbService>,
) -> Result<(), RouterError> {
    let svc = Arc::clone(&usb);
    router.register(
        Channel::UsbGetDevices,
        wrap(Arc::clone(hub), move |_args| {
            let svc = Arc::clone(&svc);
            async move { svc.devices().await }
        }),
    )?;

    let svc = Arc::clone(&usb);
    router.register(
        Channel::UsbVerifyDevice,
        wrap(Arc::clone(hub), move |args: Args| {
            let svc = Arc::clone(&svc);
            async move {
                let id = required_id(&args, "设备ID")?;
                svc.verify(&id).await
            }
        }),
    )?;

    router.register(
        Channel::UsbGetCapacity,
        wrap(Arc::clone(hub), move |args: Args| {
            let svc = Arc::clone(&usb);
            async move {
                let id = required_id(&args, "设备ID")?;
                svc.capacity(&id).await
            }
        }),
    )?;
    Ok(())
}

pub(crate) fn register_auth(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    auth: Arc<dyn AuthService>,
) -> Result<(), RouterError> {
    let svc = Arc::clone(&auth);
    router.register(
        Channel::AuthVerifyPassword,
        wrap(Arc::clone(hub), move |args: Args| {
            let svc = Arc::clone(&svc);
            async move {
                let request: PasswordVerifyRequest = args.required(0)?;
                if request.password.is_empty() {
                    return Err(invalid("密码不能为空"));
                }
                svc.verify_password(request).await
            }
        }),
    )?;

    let svc = Arc::clone(&auth);
    router.register(
        Channel::AuthCreateSession,
        wrap(Arc::clone(hub), move |_args| {
            let svc = Arc::clone(&svc);
            async move { svc.create_session().await }
        }),
    )?;

    let svc = Arc::clone(&auth);
    router.register(
        Channel::AuthDestroySession,
        wrap(Arc::clone(hub), move |args: Args| {
            let svc = Arc::clone(&svc);
            async move {
                let id = required_id(&args, "会话ID")?;
                svc.destroy_session(&id).await
            }
        }),
    )?;

    router.register(
        Channel::AuthGetSession,
        wrap(Arc::clone(hub), move |args: Args| {
            let svc = Arc::clone(&auth);
            async move {
                let id: Option<String> = args.optional(0)?;
                svc.session(id.as_deref()).await
            }
        }),
    )?;
    Ok(())
}
