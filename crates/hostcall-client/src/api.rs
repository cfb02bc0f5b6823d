//! Typed shorthands for the common channels.

use hostcall_protocol::types::{
    AppConfig, FileInfo, FileSaveOptions, FileSelectOptions, PerformanceInfo, SystemInfo,
    WindowState,
};
use hostcall_protocol::{Channel, Envelope};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::client::Client;
use crate::error::{ClientError, Result};

fn arg<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(ClientError::Decode)
}

impl Client {
    pub async fn minimize_window(&self) -> Result<()> {
        self.invoke(Channel::WindowMinimize.as_str(), Vec::new()).await
    }

    /// Maximize, or restore if already maximized.
    pub async fn maximize_window(&self) -> Result<()> {
        self.invoke(Channel::WindowMaximize.as_str(), Vec::new()).await
    }

    pub async fn close_window(&self) -> Result<()> {
        self.invoke(Channel::WindowClose.as_str(), Vec::new()).await
    }

    pub async fn window_state(&self) -> Result<WindowState> {
        self.invoke(Channel::WindowGetState.as_str(), Vec::new()).await
    }

    pub async fn safe_minimize_window(&self) -> Envelope<()> {
        self.safe_invoke(Channel::WindowMinimize.as_str(), Vec::new())
            .await
    }

    pub async fn safe_maximize_window(&self) -> Envelope<()> {
        self.safe_invoke(Channel::WindowMaximize.as_str(), Vec::new())
            .await
    }

    pub async fn safe_close_window(&self) -> Envelope<()> {
        self.safe_invoke(Channel::WindowClose.as_str(), Vec::new())
            .await
    }

    pub async fn system_info(&self) -> Result<SystemInfo> {
        self.invoke(Channel::SystemInfo.as_str(), Vec::new()).await
    }

    pub async fn safe_system_info(&self) -> Envelope<SystemInfo> {
        self.safe_invoke(Channel::SystemInfo.as_str(), Vec::new())
            .await
    }

    pub async fn app_version(&self) -> Result<String> {
        self.invoke(Channel::SystemAppVersion.as_str(), Vec::new())
            .await
    }

    pub async fn performance(&self) -> Result<PerformanceInfo> {
        self.invoke(Channel::SystemPerformance.as_str(), Vec::new())
            .await
    }

    /// Selected paths; empty when the user cancels.
    pub async fn open_file_dialog(&self, options: &FileSelectOptions) -> Result<Vec<String>> {
        self.invoke(Channel::FileOpenDialog.as_str(), vec![arg(options)?])
            .await
    }

    pub async fn save_file_dialog(&self, options: &FileSaveOptions) -> Result<Option<String>> {
        self.invoke(Channel::FileSaveDialog.as_str(), vec![arg(options)?])
            .await
    }

    pub async fn read_file(&self, path: &str) -> Result<String> {
        self.invoke(Channel::FileRead.as_str(), vec![Value::from(path)])
            .await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let args = vec![Value::from(path), Value::from(content)];
        self.invoke(Channel::FileWrite.as_str(), args).await
    }

    pub async fn file_info(&self, path: &str) -> Result<FileInfo> {
        self.invoke(Channel::FileGetInfo.as_str(), vec![Value::from(path)])
            .await
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        self.invoke(Channel::FileExists.as_str(), vec![Value::from(path)])
            .await
    }

    pub async fn safe_open_file_dialog(&self, options: &FileSelectOptions) -> Envelope<Vec<String>> {
        match arg(options) {
            Ok(options) => {
                self.safe_invoke(Channel::FileOpenDialog.as_str(), vec![options])
                    .await
            }
            Err(err) => Envelope::from(err.to_classified()),
        }
    }

    pub async fn safe_read_file(&self, path: &str) -> Envelope<String> {
        self.safe_invoke(Channel::FileRead.as_str(), vec![Value::from(path)])
            .await
    }

    pub async fn safe_write_file(&self, path: &str, content: &str) -> Envelope<()> {
        let args = vec![Value::from(path), Value::from(content)];
        self.safe_invoke(Channel::FileWrite.as_str(), args).await
    }

    pub async fn app_config(&self) -> Result<AppConfig> {
        self.invoke(Channel::ConfigGet.as_str(), Vec::new()).await
    }

    /// Apply a partial update; returns the resulting configuration.
    pub async fn set_app_config(&self, patch: Map<String, Value>) -> Result<AppConfig> {
        self.invoke(Channel::ConfigSet.as_str(), vec![Value::Object(patch)])
            .await
    }

    pub async fn safe_app_config(&self) -> Envelope<AppConfig> {
        self.safe_invoke(Channel::ConfigGet.as_str(), Vec::new())
            .await
    }

    pub async fn safe_set_app_config(&self, patch: Map<String, Value>) -> Envelope<AppConfig> {
        self.safe_invoke(Channel::ConfigSet.as_str(), vec![Value::Object(patch)])
            .await
    }
}
