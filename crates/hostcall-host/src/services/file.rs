//! `file:*` handlers on `tokio::fs`.
//!
//! OS errors are classified by cause: a missing path is `FILE_NOT_FOUND`,
//! a permission problem is `PERMISSION_DENIED`, a full disk is
//! `SYSTEM_ERROR/E_DISK_SPACE_INSUFFICIENT`, and everything else is
//! `FILE_IO_ERROR` with the code of the operation that failed.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use hostcall_protocol::types::{FileInfo, FileSaveOptions, FileSelectOptions};
use hostcall_protocol::{Channel, ErrorCode, ErrorKind};
use tokio::fs;
use tracing::{debug, info};

use crate::fault::Fault;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::wrap::{wrap, Args};

const ENOSPC: i32 = 28;

/// Native file pickers. Hosts without a display leave this unset.
#[async_trait]
pub trait FileDialogs: Send + Sync {
    /// Selected paths; empty when the user cancels.
    async fn open(&self, options: FileSelectOptions) -> Result<Vec<String>, Fault>;
    /// Chosen path; `None` when the user cancels.
    async fn save(&self, options: FileSaveOptions) -> Result<Option<String>, Fault>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum FileOp {
    Read,
    Write,
    Delete,
    Info,
    CreateDir,
    ListDir,
}

impl FileOp {
    fn failure(self) -> (ErrorCode, &'static str) {
        match self {
            FileOp::Read => (ErrorCode::FileReadError, "文件读取失败"),
            FileOp::Write => (ErrorCode::FileWriteError, "文件写入失败"),
            FileOp::Delete => (ErrorCode::FileDeleteError, "文件删除失败"),
            FileOp::Info => (ErrorCode::FileReadError, "获取文件信息失败"),
            FileOp::CreateDir => (ErrorCode::FileWriteError, "创建目录失败"),
            FileOp::ListDir => (ErrorCode::FileReadError, "读取目录失败"),
        }
    }

    fn permission_message(self) -> &'static str {
        match self {
            FileOp::Write | FileOp::CreateDir => "文件写入权限不足",
            FileOp::Delete => "文件删除权限不足",
            FileOp::Read | FileOp::Info | FileOp::ListDir => "文件访问权限不足",
        }
    }
}

pub(crate) fn io_fault(err: &io::Error, path: &str, op: FileOp) -> Fault {
    let classified = match err.kind() {
        io::ErrorKind::NotFound => match op {
            FileOp::ListDir => (
                ErrorKind::NotFound,
                ErrorCode::DirectoryNotFound,
                format!("目录不存在: {path}"),
            ),
            _ => (
                ErrorKind::NotFound,
                ErrorCode::FileNotFound,
                format!("文件不存在: {path}"),
            ),
        },
        io::ErrorKind::PermissionDenied => (
            ErrorKind::PermissionDenied,
            ErrorCode::FilePermissionError,
            format!("{}: {path}", op.permission_message()),
        ),
        _ if err.kind() == io::ErrorKind::StorageFull || err.raw_os_error() == Some(ENOSPC) => (
            ErrorKind::System,
            ErrorCode::DiskSpaceInsufficient,
            format!("磁盘空间不足: {path}"),
        ),
        _ => {
            let (code, prefix) = op.failure();
            (ErrorKind::Io, code, format!("{prefix}: {err}"))
        }
    };
    let (kind, code, message) = classified;
    Fault::Classified(
        hostcall_protocol::ClassifiedError::new(kind, code, message).with_detail("filePath", path),
    )
}

async fn file_info(path: &str) -> io::Result<FileInfo> {
    let metadata = fs::metadata(path).await?;
    Ok(describe(Path::new(path), &metadata))
}

fn describe(path: &Path, metadata: &std::fs::Metadata) -> FileInfo {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let file_type = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    FileInfo {
        path: path.to_string_lossy().into_owned(),
        name,
        size: metadata.len(),
        file_type,
        last_modified,
        is_directory: metadata.is_dir(),
    }
}

async fn read(args: Args) -> Result<String, Fault> {
    let path = args.required_path(0)?;
    let content = fs::read_to_string(&path)
        .await
        .map_err(|e| io_fault(&e, &path, FileOp::Read))?;
    info!(%path, bytes = content.len(), "file read");
    Ok(content)
}

async fn write(args: Args) -> Result<(), Fault> {
    let path = args.required_path(0)?;
    let content = args.required_str(1, "文件内容")?;
    if let Some(parent) = Path::new(&path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_fault(&e, &path, FileOp::Write))?;
    }
    fs::write(&path, content.as_bytes())
        .await
        .map_err(|e| io_fault(&e, &path, FileOp::Write))?;
    info!(%path, bytes = content.len(), "file written");
    Ok(())
}

async fn delete(args: Args) -> Result<(), Fault> {
    let path = args.required_path(0)?;
    let fault = |e: io::Error| io_fault(&e, &path, FileOp::Delete);
    let metadata = fs::symlink_metadata(&path).await.map_err(fault)?;
    if metadata.is_dir() {
        fs::remove_dir(&path).await.map_err(fault)?;
    } else {
        fs::remove_file(&path).await.map_err(fault)?;
    }
    info!(%path, "file deleted");
    Ok(())
}

async fn get_info(args: Args) -> Result<FileInfo, Fault> {
    let path = args.required_path(0)?;
    let info = file_info(&path)
        .await
        .map_err(|e| io_fault(&e, &path, FileOp::Info))?;
    debug!(%path, "file info read");
    Ok(info)
}

async fn exists(args: Args) -> Result<bool, Fault> {
    let path = args.required_path(0)?;
    Ok(fs::metadata(&path).await.is_ok())
}

async fn create_dir(args: Args) -> Result<(), Fault> {
    let path = args.required_path(0)?;
    fs::create_dir_all(&path)
        .await
        .map_err(|e| io_fault(&e, &path, FileOp::CreateDir))?;
    info!(%path, "directory created");
    Ok(())
}

async fn list_dir(args: Args) -> Result<Vec<FileInfo>, Fault> {
    let path = args.required_path(0)?;
    let fault = |e: io::Error| io_fault(&e, &path, FileOp::ListDir);
    let mut entries = fs::read_dir(&path).await.map_err(fault)?;
    let mut listing = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(fault)? {
        // Entries removed while listing are skipped.
        if let Ok(metadata) = entry.metadata().await {
            listing.push(describe(&entry.path(), &metadata));
        }
    }
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

fn dialog_fault(fault: Fault, code: ErrorCode, action: &str) -> Fault {
    match fault {
        Fault::Classified(err) => Fault::Classified(err),
        Fault::Other(err) => Fault::new(ErrorKind::Io, code, format!("{action}失败: {err}")),
    }
}

fn no_dialogs() -> Fault {
    Fault::new(
        ErrorKind::System,
        ErrorCode::NotImplemented,
        "文件对话框不可用",
    )
}

pub(crate) fn register(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    dialogs: Option<Arc<dyn FileDialogs>>,
) -> Result<(), RouterError> {
    router.register(Channel::FileRead, wrap(Arc::clone(hub), read))?;
    router.register(Channel::FileWrite, wrap(Arc::clone(hub), write))?;
    router.register(Channel::FileDelete, wrap(Arc::clone(hub), delete))?;
    router.register(Channel::FileGetInfo, wrap(Arc::clone(hub), get_info))?;
    router.register(Channel::FileExists, wrap(Arc::clone(hub), exists))?;
    router.register(Channel::FileCreateDir, wrap(Arc::clone(hub), create_dir))?;
    router.register(Channel::FileListDir, wrap(Arc::clone(hub), list_dir))?;

    let open_dialogs = dialogs.clone();
    router.register(
        Channel::FileOpenDialog,
        wrap(Arc::clone(hub), move |args: Args| {
            let dialogs = open_dialogs.clone();
            async move {
                let dialogs = dialogs.ok_or_else(no_dialogs)?;
                let options: FileSelectOptions = args.optional(0)?.unwrap_or_default();
                dialogs
                    .open(options)
                    .await
                    .map_err(|f| dialog_fault(f, ErrorCode::FileReadError, "打开文件对话框"))
            }
        }),
    )?;

    router.register(
        Channel::FileSaveDialog,
        wrap(Arc::clone(hub), move |args: Args| {
            let dialogs = dialogs.clone();
            async move {
                let dialogs = dialogs.ok_or_else(no_dialogs)?;
                let options: FileSaveOptions = args.optional(0)?.unwrap_or_default();
                dialogs
                    .save(options)
                    .await
                    .map_err(|f| dialog_fault(f, ErrorCode::FileWriteError, "保存文件对话框"))
            }
        }),
    )?;
    Ok(())
}
