use std::time::Duration;

use hostcall_protocol::{ClassifiedError, ErrorCode, ErrorKind, ProtocolError, RemoteFailure};
use hostcall_transport::TransportError;

/// Why an invoke call did not produce its data.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport reported itself unavailable; no call was made.
    #[error("IPC通道不可用")]
    Unavailable,

    /// No response within the request timeout.
    #[error("IPC调用超时: {channel}")]
    Timeout { channel: String, after: Duration },

    /// The host answered with a failure envelope. Displays exactly the
    /// envelope's `error`.
    #[error("{message}")]
    Remote { message: String, code: String },

    /// The host answered success without a `data` field.
    #[error("IPC响应数据为空: {channel}")]
    EmptyData { channel: String },

    /// The response did not parse as an envelope.
    #[error("invalid response: {0}")]
    Protocol(#[from] ProtocolError),

    /// The transport failed underneath the call.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response data did not have the expected shape.
    #[error("response data mismatch: {0}")]
    Decode(#[source] serde_json::Error),
}

impl From<RemoteFailure> for ClientError {
    fn from(failure: RemoteFailure) -> Self {
        ClientError::Remote {
            message: failure.message,
            code: failure.code,
        }
    }
}

impl ClientError {
    /// The error code carried to callers, as a wire string.
    pub fn code(&self) -> String {
        match self {
            ClientError::Remote { code, .. } => code.clone(),
            other => other.to_classified().code.as_str().to_string(),
        }
    }

    /// Classify this error on the client side.
    ///
    /// Remote failures keep their code when it is in the catalog; unknown
    /// remote codes and local protocol trouble become `UNKNOWN_ERROR`.
    pub fn to_classified(&self) -> ClassifiedError {
        match self {
            ClientError::Unavailable => ClassifiedError::new(
                ErrorKind::System,
                ErrorCode::NetworkUnavailable,
                self.to_string(),
            ),
            ClientError::Timeout { channel, after } => ClassifiedError::new(
                ErrorKind::Timeout,
                ErrorCode::RequestTimeout,
                self.to_string(),
            )
            .with_detail("channel", channel.as_str())
            .with_detail("timeoutMs", after.as_millis() as u64),
            ClientError::Remote { message, code } => match ErrorCode::parse(code) {
                Some(known) => ClassifiedError::new(known.default_kind(), known, message.as_str()),
                None => ClassifiedError::new(
                    ErrorKind::Unknown,
                    ErrorCode::UnknownError,
                    message.as_str(),
                )
                .with_detail("remoteCode", code.as_str()),
            },
            ClientError::Transport(err) => {
                ClassifiedError::from_error_as(err, ErrorKind::Network, ErrorCode::ConnectionLost)
            }
            ClientError::EmptyData { .. } | ClientError::Protocol(_) | ClientError::Decode(_) => {
                ClassifiedError::from_error(self)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_display_is_the_envelope_error() {
        let err = ClientError::from(RemoteFailure::new("文件不存在: /a", "E_FILE_NOT_FOUND"));
        assert_eq!(err.to_string(), "文件不存在: /a");
        assert_eq!(err.code(), "E_FILE_NOT_FOUND");

        let classified = err.to_classified();
        assert_eq!(classified.kind, ErrorKind::NotFound);
        assert_eq!(classified.code, ErrorCode::FileNotFound);
    }

    #[test]
    fn unknown_remote_code_is_kept_on_the_wire_only() {
        let err = ClientError::Remote {
            message: "boom".into(),
            code: "E_FROM_THE_FUTURE".into(),
        };
        assert_eq!(err.code(), "E_FROM_THE_FUTURE");
        assert_eq!(err.to_classified().code, ErrorCode::UnknownError);
    }

    #[test]
    fn timeout_classification() {
        let err = ClientError::Timeout {
            channel: "system:info".into(),
            after: Duration::from_millis(50),
        };
        let classified = err.to_classified();
        assert_eq!(classified.kind, ErrorKind::Timeout);
        assert_eq!(classified.code, ErrorCode::RequestTimeout);
        assert_eq!(classified.message, "IPC调用超时: system:info");
    }

    #[test]
    fn unavailable_classification() {
        let classified = ClientError::Unavailable.to_classified();
        assert_eq!(classified.kind, ErrorKind::System);
        assert_eq!(classified.code, ErrorCode::NetworkUnavailable);
    }
}
