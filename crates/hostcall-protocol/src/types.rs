//! Payload types exchanged on the surfaced channels.
//!
//! Field names follow the camelCase wire convention shared by both endpoints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Host platform summary returned by `system:info`. Memory figures are MiB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: String,
    pub arch: String,
    pub os_version: String,
    pub app_version: String,
    pub host_version: String,
    pub memory: MemoryInfo,
    pub cpu: CpuInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub available: u64,
    pub used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub model: String,
    pub cores: usize,
    pub usage: f32,
}

/// Host process figures returned by `system:performance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInfo {
    /// Resident set size in bytes.
    pub resident_memory: u64,
    pub virtual_memory: u64,
    /// Seconds since the host started.
    pub uptime: u64,
    /// Process CPU usage in percent.
    pub cpu_usage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    pub is_maximized: bool,
    pub is_minimized: bool,
    pub is_full_screen: bool,
    pub is_visible: bool,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSelectOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FileFilter>>,
    #[serde(default)]
    pub multi_selections: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSaveOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<FileFilter>>,
}

/// Metadata returned by `file:get-info` and `file:list-dir`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub size: u64,
    /// Extension without the dot, or `unknown`.
    #[serde(rename = "type")]
    pub file_type: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: u64,
    pub is_directory: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEncryptRequest {
    pub source_path: String,
    pub output_path: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDecryptRequest {
    pub encrypted_path: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStage {
    Reading,
    Encrypting,
    Decrypting,
    Writing,
    Completed,
    Error,
}

/// Payload of `video:process-progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoProcessProgress {
    pub progress: f32,
    pub stage: VideoStage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f32,
    pub bit_rate: u64,
    pub codec: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsbStatus {
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsbDevice {
    pub device_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub capacity: u64,
    pub free_space: u64,
    pub mount_path: String,
    pub file_system: String,
    pub is_removable: bool,
    pub status: UsbStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordVerifyRequest {
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub is_authenticated: bool,
    pub login_time: u64,
    pub last_activity: u64,
    pub expires_at: u64,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullScreenMode {
    Window,
    Screen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    /// Minutes of inactivity before a session expires.
    pub session_timeout: u32,
    pub max_password_attempts: u32,
    pub prevent_screen_capture: bool,
}

/// Application configuration exchanged on `config:*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub language: Language,
    pub theme: Theme,
    pub auto_play: bool,
    /// 0..=100
    pub default_volume: u8,
    pub playback_rate: f32,
    pub full_screen_mode: FullScreenMode,
    pub security: SecurityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: Language::ZhCn,
            theme: Theme::Light,
            auto_play: false,
            default_volume: 80,
            playback_rate: 1.0,
            full_screen_mode: FullScreenMode::Window,
            security: SecurityConfig {
                session_timeout: 30,
                max_password_attempts: 3,
                prevent_screen_capture: true,
            },
        }
    }
}

impl AppConfig {
    /// Apply a partial update. Top-level keys in `patch` replace the current
    /// values; the result must still be a valid configuration.
    pub fn merged(&self, patch: &Map<String, Value>) -> Result<AppConfig, serde_json::Error> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        serde_json::from_value(Value::Object(current))
    }
}

/// Line submitted on `log:write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn app_config_defaults_on_the_wire() {
        let value = serde_json::to_value(AppConfig::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "language": "zh-CN",
                "theme": "light",
                "autoPlay": false,
                "defaultVolume": 80,
                "playbackRate": 1.0,
                "fullScreenMode": "window",
                "security": {
                    "sessionTimeout": 30,
                    "maxPasswordAttempts": 3,
                    "preventScreenCapture": true
                }
            })
        );
    }

    #[test]
    fn merge_replaces_top_level_keys() {
        let patch = json!({"theme": "dark", "defaultVolume": 20});
        let merged = AppConfig::default()
            .merged(patch.as_object().unwrap())
            .unwrap();
        assert_eq!(merged.theme, Theme::Dark);
        assert_eq!(merged.default_volume, 20);
        assert_eq!(merged.language, Language::ZhCn);
    }

    #[test]
    fn merge_rejects_invalid_values() {
        let patch = json!({"theme": "purple"});
        assert!(AppConfig::default().merged(patch.as_object().unwrap()).is_err());
    }

    #[test]
    fn file_info_uses_type_key() {
        let info = FileInfo {
            path: "/a/b.txt".into(),
            name: "b.txt".into(),
            size: 3,
            file_type: "txt".into(),
            last_modified: 1,
            is_directory: false,
        };
        let value = serde_json::to_value(info).unwrap();
        assert_eq!(value["type"], "txt");
        assert_eq!(value["isDirectory"], false);
        assert_eq!(value["lastModified"], 1);
    }

    #[test]
    fn window_state_wire_names() {
        let value = serde_json::to_value(WindowState::default()).unwrap();
        assert_eq!(value["isFullScreen"], false);
        assert_eq!(value["bounds"]["width"], 0);
    }
}
