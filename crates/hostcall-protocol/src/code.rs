//! Error kinds and the error code catalog.
//!
//! [`ErrorKind`] is the coarse category used for routing and telemetry.
//! [`ErrorCode`] is the fine, stable, loggable code. Every code has exactly
//! one canonical message and a default kind (its catalog group), but any
//! code may be classified under any kind.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Message used for codes that are not in the catalog.
pub const FALLBACK_MESSAGE: &str = "未知错误";

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    #[serde(rename = "INVALID_PARAMS")]
    InvalidParams,
    #[serde(rename = "PERMISSION_DENIED")]
    PermissionDenied,
    #[serde(rename = "FILE_NOT_FOUND")]
    NotFound,
    #[serde(rename = "FILE_IO_ERROR")]
    Io,
    #[serde(rename = "CRYPTO_ERROR")]
    Crypto,
    #[serde(rename = "SYSTEM_ERROR")]
    System,
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::Network,
        ErrorKind::InvalidParams,
        ErrorKind::PermissionDenied,
        ErrorKind::NotFound,
        ErrorKind::Io,
        ErrorKind::Crypto,
        ErrorKind::System,
        ErrorKind::Timeout,
        ErrorKind::Unknown,
    ];

    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::InvalidParams => "INVALID_PARAMS",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::NotFound => "FILE_NOT_FOUND",
            ErrorKind::Io => "FILE_IO_ERROR",
            ErrorKind::Crypto => "CRYPTO_ERROR",
            ErrorKind::System => "SYSTEM_ERROR",
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! error_codes {
    ($( $(#[$meta:meta])* $variant:ident => ($code:literal, $kind:ident, $message:literal), )*) => {
        /// Stable machine-readable error code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ErrorCode {
            $( $(#[$meta])* $variant, )*
        }

        impl ErrorCode {
            /// The full catalog, grouped by default kind.
            pub const ALL: &'static [ErrorCode] = &[ $( ErrorCode::$variant, )* ];

            /// The `E_*` code string.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $code, )*
                }
            }

            /// Canonical human-readable message.
            pub fn message(self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $message, )*
                }
            }

            /// Kind this code is classified under unless the caller says otherwise.
            pub fn default_kind(self) -> ErrorKind {
                match self {
                    $( ErrorCode::$variant => ErrorKind::$kind, )*
                }
            }
        }
    };
}

error_codes! {
    NetworkTimeout => ("E_NETWORK_TIMEOUT", Network, "网络连接超时"),
    NetworkUnavailable => ("E_NETWORK_UNAVAILABLE", Network, "网络不可用"),
    ConnectionLost => ("E_CONNECTION_LOST", Network, "连接已断开"),

    InvalidParams => ("E_INVALID_PARAMS", InvalidParams, "参数无效"),
    MissingParams => ("E_MISSING_PARAMS", InvalidParams, "缺少必要参数"),
    ParamsTypeError => ("E_PARAMS_TYPE_ERROR", InvalidParams, "参数类型错误"),

    PermissionDenied => ("E_PERMISSION_DENIED", PermissionDenied, "权限不足"),
    AccessForbidden => ("E_ACCESS_FORBIDDEN", PermissionDenied, "访问被禁止"),
    AuthenticationRequired => ("E_AUTHENTICATION_REQUIRED", PermissionDenied, "需要身份验证"),
    SessionExpired => ("E_SESSION_EXPIRED", PermissionDenied, "会话已过期"),
    FilePermissionError => ("E_FILE_PERMISSION_ERROR", PermissionDenied, "文件权限不足"),

    FileNotFound => ("E_FILE_NOT_FOUND", NotFound, "文件不存在"),
    DirectoryNotFound => ("E_DIRECTORY_NOT_FOUND", NotFound, "目录不存在"),
    UsbNotFound => ("E_USB_NOT_FOUND", NotFound, "U盘未找到"),

    FileReadError => ("E_FILE_READ_ERROR", Io, "文件读取失败"),
    FileWriteError => ("E_FILE_WRITE_ERROR", Io, "文件写入失败"),
    FileDeleteError => ("E_FILE_DELETE_ERROR", Io, "文件删除失败"),
    DiskSpaceInsufficient => ("E_DISK_SPACE_INSUFFICIENT", Io, "磁盘空间不足"),
    UsbReadError => ("E_USB_READ_ERROR", Io, "U盘读取失败"),
    UsbWriteError => ("E_USB_WRITE_ERROR", Io, "U盘写入失败"),
    VideoCorrupted => ("E_VIDEO_CORRUPTED", Io, "视频文件已损坏"),

    CryptoEncryptError => ("E_CRYPTO_ENCRYPT_ERROR", Crypto, "加密失败"),
    CryptoDecryptError => ("E_CRYPTO_DECRYPT_ERROR", Crypto, "解密失败"),
    CryptoKeyError => ("E_CRYPTO_KEY_ERROR", Crypto, "密钥错误"),
    CryptoAlgorithmError => ("E_CRYPTO_ALGORITHM_ERROR", Crypto, "加密算法错误"),
    PasswordIncorrect => ("E_PASSWORD_INCORRECT", Crypto, "密码错误"),

    SystemError => ("E_SYSTEM_ERROR", System, "系统错误"),
    MemoryInsufficient => ("E_MEMORY_INSUFFICIENT", System, "内存不足"),
    CpuOverload => ("E_CPU_OVERLOAD", System, "CPU负载过高"),
    ProcessError => ("E_PROCESS_ERROR", System, "进程错误"),
    InternalError => ("E_INTERNAL_ERROR", System, "内部错误"),
    NotImplemented => ("E_NOT_IMPLEMENTED", System, "功能未实现"),
    UsbVerificationFailed => ("E_USB_VERIFICATION_FAILED", System, "U盘验证失败"),
    VideoFormatError => ("E_VIDEO_FORMAT_ERROR", System, "视频格式不支持"),
    VideoCodecError => ("E_VIDEO_CODEC_ERROR", System, "视频编解码错误"),
    VideoTooLarge => ("E_VIDEO_TOO_LARGE", System, "视频文件过大"),

    TimeoutError => ("E_TIMEOUT_ERROR", Timeout, "操作超时"),
    OperationTimeout => ("E_OPERATION_TIMEOUT", Timeout, "操作超时"),
    RequestTimeout => ("E_REQUEST_TIMEOUT", Timeout, "请求超时"),

    UnknownError => ("E_UNKNOWN_ERROR", Unknown, "未知错误"),
}

impl ErrorCode {
    /// Look up a code by its `E_*` string.
    pub fn parse(code: &str) -> Option<ErrorCode> {
        ErrorCode::ALL.iter().copied().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a code that is not in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown error code '{0}'")]
pub struct UnknownCode(pub String);

impl FromStr for ErrorCode {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::parse(s).ok_or_else(|| UnknownCode(s.to_string()))
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

/// Canonical message for a code string; total over all inputs.
pub fn message_for(code: &str) -> &'static str {
    ErrorCode::parse(code)
        .map(ErrorCode::message)
        .unwrap_or(FALLBACK_MESSAGE)
}
