use std::path::PathBuf;
use std::sync::Arc;

use hostcall_protocol::types::{LogEntry, LogLevel};
use hostcall_protocol::Channel;
use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::fault::Fault;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::services::file::{io_fault, FileOp};
use crate::wrap::{wrap, wrap_sync, Args};

const RENDERER_SCOPE: &str = "renderer";

fn forward(entry: &LogEntry) {
    let scope = entry.scope.as_deref().unwrap_or(RENDERER_SCOPE);
    let message = entry.message.as_str();
    match entry.level {
        LogLevel::Error => error!(target: "hostcall::renderer", scope, "{message}"),
        LogLevel::Warn => warn!(target: "hostcall::renderer", scope, "{message}"),
        LogLevel::Info => info!(target: "hostcall::renderer", scope, "{message}"),
        LogLevel::Debug => debug!(target: "hostcall::renderer", scope, "{message}"),
    }
}

/// Remove every `*.log` file directly under `dir`. Returns how many went.
async fn clean(dir: PathBuf) -> Result<usize, Fault> {
    let shown = dir.to_string_lossy().into_owned();
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(io_fault(&err, &shown, FileOp::ListDir)),
    };
    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|err| io_fault(&err, &shown, FileOp::ListDir))?
    {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "log") {
            continue;
        }
        let file = path.to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .await
            .map_err(|err| io_fault(&err, &file, FileOp::Info))?;
        if !file_type.is_file() {
            continue;
        }
        match fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            // Gone between listing and removal.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(io_fault(&err, &file, FileOp::Delete)),
        }
    }
    info!(dir = %dir.display(), removed, "log files cleaned");
    Ok(removed)
}

pub(crate) fn register(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    log_dir: PathBuf,
) -> Result<(), RouterError> {
    router.register(
        Channel::LogWrite,
        wrap_sync(Arc::clone(hub), |args: Args| {
            let entry: LogEntry = args.required(0)?;
            forward(&entry);
            Ok(())
        }),
    )?;

    let path_dir = log_dir.clone();
    router.register(
        Channel::LogGetPath,
        wrap_sync(Arc::clone(hub), move |_args| {
            Ok::<_, Fault>(path_dir.to_string_lossy().into_owned())
        }),
    )?;

    router.register(
        Channel::LogClean,
        wrap(Arc::clone(hub), move |_args| clean(log_dir.clone())),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clean_removes_only_log_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.log"), "a").unwrap();
        std::fs::write(dir.path().join("renderer.log"), "b").unwrap();
        std::fs::write(dir.path().join("keep.txt"), "c").unwrap();
        std::fs::create_dir(dir.path().join("archive.log")).unwrap();

        let removed = clean(dir.path().to_path_buf()).await.unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("keep.txt").exists());
        assert!(dir.path().join("archive.log").is_dir());
    }

    #[tokio::test]
    async fn clean_of_a_regular_file_is_a_classified_io_error() {
        use hostcall_protocol::{ErrorCode, ErrorKind};

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir.log");
        std::fs::write(&file, "x").unwrap();

        let err = clean(file.clone()).await.unwrap_err().into_classified();
        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.code, ErrorCode::FileReadError);
        assert!(err.message.starts_with("读取目录失败: "), "{}", err.message);
        assert_eq!(
            err.details.as_ref().and_then(|d| d.get("filePath")),
            Some(&serde_json::json!(file.to_string_lossy()))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn clean_without_permission_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        use hostcall_protocol::{ErrorCode, ErrorKind};

        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        std::fs::create_dir(&logs).unwrap();
        std::fs::write(logs.join("main.log"), "a").unwrap();
        std::fs::set_permissions(&logs, std::fs::Permissions::from_mode(0o500)).unwrap();
        // Root ignores directory write bits.
        let writable = std::fs::File::create(logs.join("root-check")).is_ok();

        let result = clean(logs.clone()).await;
        std::fs::set_permissions(&logs, std::fs::Permissions::from_mode(0o700)).unwrap();
        if writable {
            return;
        }
        let err = result.unwrap_err().into_classified();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);
        assert_eq!(err.code, ErrorCode::FilePermissionError);
    }

    #[tokio::test]
    async fn clean_of_missing_dir_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let removed = clean(dir.path().join("absent")).await.unwrap();
        assert_eq!(removed, 0);
    }
}
