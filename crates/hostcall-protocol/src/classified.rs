use std::error::Error as StdError;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::now_millis;
use crate::code::{ErrorCode, ErrorKind};

/// A fully classified failure: kind, stable code, message and optional context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message}")]
pub struct ClassifiedError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub timestamp: u64,
}

/// Build a classified error. An empty or missing message is replaced by the
/// catalog message for `code`.
pub fn classify(
    kind: ErrorKind,
    code: ErrorCode,
    message: Option<String>,
    details: Option<Map<String, Value>>,
    stack: Option<String>,
) -> ClassifiedError {
    let message = match message {
        Some(m) if !m.is_empty() => m,
        _ => code.message().to_string(),
    };
    ClassifiedError {
        kind,
        code,
        message,
        details,
        stack,
        timestamp: now_millis(),
    }
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        classify(kind, code, Some(message.into()), None, None)
    }

    /// Classified under the code's default kind with its catalog message.
    pub fn from_code(code: ErrorCode) -> Self {
        classify(code.default_kind(), code, None, None, None)
    }

    /// Catch-all classification of an arbitrary error.
    pub fn from_error<E: StdError + ?Sized>(err: &E) -> Self {
        Self::from_error_as(err, ErrorKind::Unknown, ErrorCode::UnknownError)
    }

    /// Like [`from_error`](Self::from_error) but under an explicit kind and code.
    pub fn from_error_as<E: StdError + ?Sized>(err: &E, kind: ErrorKind, code: ErrorCode) -> Self {
        classify(kind, code, Some(err.to_string()), None, source_chain(err))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        if !message.is_empty() {
            self.message = message;
        }
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

fn source_chain<E: StdError + ?Sized>(err: &E) -> Option<String> {
    let mut lines = Vec::new();
    let mut next = err.source();
    while let Some(cause) = next {
        lines.push(format!("caused by: {cause}"));
        next = cause.source();
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use serde_json::json;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("load failed")]
    struct Outer(#[source] io::Error);

    #[test]
    fn empty_message_falls_back_to_catalog() {
        let err = classify(
            ErrorKind::NotFound,
            ErrorCode::FileNotFound,
            Some(String::new()),
            None,
            None,
        );
        assert_eq!(err.message, "文件不存在");

        let err = classify(ErrorKind::System, ErrorCode::SystemError, None, None, None);
        assert_eq!(err.message, "系统错误");
    }

    #[test]
    fn kind_and_code_are_independent() {
        let err = ClassifiedError::new(ErrorKind::System, ErrorCode::DiskSpaceInsufficient, "磁盘空间不足: /tmp");
        assert_eq!(err.kind, ErrorKind::System);
        assert_eq!(err.code, ErrorCode::DiskSpaceInsufficient);
        assert_eq!(err.to_string(), "[E_DISK_SPACE_INSUFFICIENT] 磁盘空间不足: /tmp");
    }

    #[test]
    fn from_error_records_source_chain() {
        let err = Outer(io::Error::new(io::ErrorKind::Other, "disk gone"));
        let classified = ClassifiedError::from_error(&err);
        assert_eq!(classified.kind, ErrorKind::Unknown);
        assert_eq!(classified.code, ErrorCode::UnknownError);
        assert_eq!(classified.message, "load failed");
        assert_eq!(classified.stack.as_deref(), Some("caused by: disk gone"));
    }

    #[test]
    fn serializes_with_wire_names() {
        let err = ClassifiedError::from_code(ErrorCode::FileNotFound).with_detail("path", "/x");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "FILE_NOT_FOUND");
        assert_eq!(value["code"], "E_FILE_NOT_FOUND");
        assert_eq!(value["details"], json!({"path": "/x"}));
        assert!(value.get("stack").is_none());

        let back: ClassifiedError = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn with_message_ignores_empty() {
        let err = ClassifiedError::from_code(ErrorCode::InternalError).with_message("");
        assert_eq!(err.message, "内部错误");
    }
}
