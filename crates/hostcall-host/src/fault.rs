use std::any::Any;
use std::error::Error as StdError;

use hostcall_protocol::{ClassifiedError, ErrorCode, ErrorKind};

/// Failure returned by a host operation.
///
/// Classified failures pass through unchanged; anything else is classified
/// as `UNKNOWN_ERROR/E_UNKNOWN_ERROR` when the wrapper turns it into an
/// envelope.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Classified(#[from] ClassifiedError),

    #[error("{0}")]
    Other(Box<dyn StdError + Send + Sync>),
}

impl Fault {
    pub fn new(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        Fault::Classified(ClassifiedError::new(kind, code, message))
    }

    pub fn other(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Fault::Other(err.into())
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Fault::new(
            ErrorKind::Unknown,
            ErrorCode::UnknownError,
            format!("处理器异常: {}", panic_message(payload)),
        )
    }

    pub fn into_classified(self) -> ClassifiedError {
        match self {
            Fault::Classified(err) => err,
            Fault::Other(err) => ClassifiedError::from_error(&*err),
        }
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Fault::Other(Box::new(err))
    }
}

impl From<serde_json::Error> for Fault {
    fn from(err: serde_json::Error) -> Self {
        Fault::Other(Box::new(err))
    }
}

impl From<Box<dyn StdError + Send + Sync>> for Fault {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        Fault::Other(err)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
