//! `config:*` handlers and the store behind them.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hostcall_protocol::types::AppConfig;
use hostcall_protocol::{Channel, ClassifiedError, ErrorCode, ErrorKind};
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::events::EventBus;
use crate::fault::Fault;
use crate::hub::ErrorHub;
use crate::router::{Router, RouterError};
use crate::wrap::{wrap, Args};

/// Application configuration, optionally backed by a JSON file.
///
/// A file-backed store reads its file on first use. Updates are written
/// back while the store is locked, so concurrent `set` calls persist in
/// the order they apply.
#[derive(Debug)]
pub struct ConfigStore {
    current: Mutex<Option<AppConfig>>,
    path: Option<PathBuf>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ConfigStore {
    /// Defaults, never persisted.
    pub fn in_memory() -> Self {
        Self {
            current: Mutex::new(Some(AppConfig::default())),
            path: None,
        }
    }

    /// Backed by `path`. A missing or unreadable file yields the defaults;
    /// later updates are written back to `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            current: Mutex::new(None),
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn load(&self) -> AppConfig {
        let Some(path) = &self.path else {
            return AppConfig::default();
        };
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "config file unreadable, using defaults");
                AppConfig::default()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => AppConfig::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "config file unreadable, using defaults");
                AppConfig::default()
            }
        }
    }

    async fn lock(&self) -> MappedMutexGuard<'_, AppConfig> {
        let mut guard = self.current.lock().await;
        if guard.is_none() {
            *guard = Some(self.load().await);
        }
        MutexGuard::map(guard, |current| current.get_or_insert_with(AppConfig::default))
    }

    pub async fn get(&self) -> AppConfig {
        self.lock().await.clone()
    }

    /// Replace the top-level keys named in `patch`.
    pub async fn set(&self, patch: &Map<String, Value>) -> Result<AppConfig, Fault> {
        let mut current = self.lock().await;
        let updated = current.merged(patch).map_err(|err| {
            Fault::new(
                ErrorKind::InvalidParams,
                ErrorCode::ParamsTypeError,
                format!("配置参数无效: {err}"),
            )
        })?;
        self.persist(&updated).await?;
        *current = updated.clone();
        Ok(updated)
    }

    pub async fn reset(&self) -> Result<AppConfig, Fault> {
        let mut current = self.lock().await;
        let defaults = AppConfig::default();
        self.persist(&defaults).await?;
        *current = defaults.clone();
        Ok(defaults)
    }

    async fn persist(&self, config: &AppConfig) -> Result<(), Fault> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let written = async {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            let json = serde_json::to_vec_pretty(config)?;
            fs::write(path, json).await
        };
        written.await.map_err(|err: io::Error| {
            Fault::Classified(
                ClassifiedError::new(
                    ErrorKind::Io,
                    ErrorCode::FileWriteError,
                    format!("配置保存失败: {err}"),
                )
                .with_detail("filePath", path.display().to_string()),
            )
        })
    }
}

pub(crate) fn register(
    router: &mut Router,
    hub: &Arc<ErrorHub>,
    store: Arc<ConfigStore>,
    events: EventBus,
) -> Result<(), RouterError> {
    let get_store = Arc::clone(&store);
    router.register(
        Channel::ConfigGet,
        wrap(Arc::clone(hub), move |_args| {
            let store = Arc::clone(&get_store);
            async move { Ok::<_, Fault>(store.get().await) }
        }),
    )?;

    let set_store = Arc::clone(&store);
    let set_events = events.clone();
    router.register(
        Channel::ConfigSet,
        wrap(Arc::clone(hub), move |args: Args| {
            let store = Arc::clone(&set_store);
            let events = set_events.clone();
            async move {
                let patch: Map<String, Value> = args.required(0)?;
                let updated = store.set(&patch).await?;
                info!(keys = patch.len(), "config updated");
                events.publish(Channel::ConfigChanged, &updated);
                Ok(updated)
            }
        }),
    )?;

    router.register(
        Channel::ConfigReset,
        wrap(Arc::clone(hub), move |_args| {
            let store = Arc::clone(&store);
            let events = events.clone();
            async move {
                let defaults = store.reset().await?;
                info!("config reset to defaults");
                events.publish(Channel::ConfigChanged, &defaults);
                Ok(defaults)
            }
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hostcall_protocol::types::{Language, Theme};
    use serde_json::json;

    use super::*;

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn set_merges_top_level_keys() {
        let store = ConfigStore::in_memory();
        let updated = store.set(&patch(json!({"language": "en-US"}))).await.unwrap();
        assert_eq!(updated.language, Language::EnUs);
        assert_eq!(updated.theme, AppConfig::default().theme);
        assert_eq!(store.get().await, updated);
    }

    #[tokio::test]
    async fn invalid_patch_leaves_config_untouched() {
        let store = ConfigStore::in_memory();
        let err = store
            .set(&patch(json!({"theme": 42})))
            .await
            .unwrap_err()
            .into_classified();
        assert_eq!(err.kind, ErrorKind::InvalidParams);
        assert_eq!(err.code, ErrorCode::ParamsTypeError);
        assert_eq!(store.get().await, AppConfig::default());
    }

    #[tokio::test]
    async fn persisted_config_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let store = ConfigStore::open(&path);
        assert_eq!(store.get().await, AppConfig::default());
        store.set(&patch(json!({"theme": "dark"}))).await.unwrap();

        let reopened = ConfigStore::open(&path);
        assert_eq!(reopened.get().await.theme, Theme::Dark);

        reopened.reset().await.unwrap();
        assert_eq!(ConfigStore::open(&path).get().await, AppConfig::default());
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ConfigStore::open(&path).get().await, AppConfig::default());
    }

    #[tokio::test]
    async fn open_touches_nothing_until_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::open(&path);
        let saved = AppConfig {
            theme: Theme::Dark,
            ..AppConfig::default()
        };
        std::fs::write(&path, serde_json::to_vec(&saved).unwrap()).unwrap();
        assert_eq!(store.get().await.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn concurrent_updates_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = Arc::new(ConfigStore::open(&path));

        let theme = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set(&patch(json!({"theme": "dark"}))).await })
        };
        let language = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set(&patch(json!({"language": "en-US"}))).await })
        };
        theme.await.unwrap().unwrap();
        language.await.unwrap().unwrap();

        let reopened = ConfigStore::open(&path).get().await;
        assert_eq!(reopened.theme, Theme::Dark);
        assert_eq!(reopened.language, Language::EnUs);
    }

    #[tokio::test]
    async fn unwritable_path_is_a_classified_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = ConfigStore::open(blocker.join("config.json"));

        let err = store
            .set(&patch(json!({"theme": "dark"})))
            .await
            .unwrap_err()
            .into_classified();
        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(err.code, ErrorCode::FileWriteError);
        assert!(err.message.starts_with("配置保存失败: "));
        assert_eq!(store.get().await, AppConfig::default());
    }
}
