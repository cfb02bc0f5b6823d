//! The response envelope exchanged for every invoke call.
//!
//! [`Envelope`] makes success and failure mutually exclusive at the type
//! level. On the wire it takes the flat form described by [`WireEnvelope`]:
//!
//! ```json
//! {"success": true,  "data": {...}, "timestamp": 1700000000000}
//! {"success": false, "error": "文件不存在: /a", "errorCode": "E_FILE_NOT_FOUND", "timestamp": 1700000000000}
//! ```
//!
//! A unit payload serializes as `"data": null`, which still counts as present.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::classified::ClassifiedError;
use crate::clock::now_millis;
use crate::code::ErrorCode;
use crate::error::ProtocolError;

/// Result half of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Failure { error: String, error_code: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T = Value> {
    pub outcome: Outcome<T>,
    pub timestamp: u64,
}

/// The error half of a failed envelope, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteFailure {
    pub message: String,
    pub code: String,
}

impl RemoteFailure {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }

    /// The code as a catalog entry, if it is one.
    pub fn known_code(&self) -> Option<ErrorCode> {
        ErrorCode::parse(&self.code)
    }
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            outcome: Outcome::Success(data),
            timestamp: now_millis(),
        }
    }

    /// Failure from a bare message. The code defaults to `E_UNKNOWN_ERROR`.
    pub fn err(message: impl Into<String>, code: Option<ErrorCode>) -> Self {
        let code = code.unwrap_or(ErrorCode::UnknownError);
        Self::from_failure(RemoteFailure::new(message, code))
    }

    pub fn from_failure(failure: RemoteFailure) -> Self {
        Self {
            outcome: Outcome::Failure {
                error: failure.message,
                error_code: failure.code,
            },
            timestamp: now_millis(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Success(data) => Some(data),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error, .. } => Some(error),
            Outcome::Success(_) => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error_code, .. } => Some(error_code),
            Outcome::Success(_) => None,
        }
    }

    /// The payload, or the failure carried by the envelope.
    pub fn into_data(self) -> Result<T, RemoteFailure> {
        match self.outcome {
            Outcome::Success(data) => Ok(data),
            Outcome::Failure { error, error_code } => Err(RemoteFailure::new(error, error_code)),
        }
    }

    /// Transform the payload, keeping the timestamp and any failure.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        let outcome = match self.outcome {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::Failure { error, error_code } => Outcome::Failure { error, error_code },
        };
        Envelope {
            outcome,
            timestamp: self.timestamp,
        }
    }

    fn to_wire(&self) -> WireEnvelope<&T> {
        match &self.outcome {
            Outcome::Success(data) => WireEnvelope {
                success: true,
                data: Some(data),
                error: None,
                error_code: None,
                timestamp: self.timestamp,
            },
            Outcome::Failure { error, error_code } => WireEnvelope {
                success: false,
                data: None,
                error: Some(error.clone()),
                error_code: Some(error_code.clone()),
                timestamp: self.timestamp,
            },
        }
    }
}

impl<T> From<&ClassifiedError> for Envelope<T> {
    fn from(err: &ClassifiedError) -> Self {
        Self::from_failure(RemoteFailure::new(err.message.clone(), err.code))
    }
}

impl<T> From<ClassifiedError> for Envelope<T> {
    fn from(err: ClassifiedError) -> Self {
        Self::from_failure(RemoteFailure::new(err.message, err.code))
    }
}

/// Flat serde form of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct WireEnvelope<T> {
    pub success: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub timestamp: u64,
}

// A `data` key that is present, even as null, is Some.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl<T> TryFrom<WireEnvelope<T>> for Envelope<T> {
    type Error = ProtocolError;

    fn try_from(wire: WireEnvelope<T>) -> Result<Self, Self::Error> {
        let outcome = if wire.success {
            if wire.error.is_some() || wire.error_code.is_some() {
                return Err(ProtocolError::Malformed(
                    "success envelope carries error fields".into(),
                ));
            }
            Outcome::Success(wire.data.ok_or(ProtocolError::MissingData)?)
        } else {
            if wire.data.is_some() {
                return Err(ProtocolError::Malformed(
                    "failure envelope carries data".into(),
                ));
            }
            let error = wire
                .error
                .ok_or_else(|| ProtocolError::Malformed("failure envelope has no error".into()))?;
            let error_code = wire.error_code.ok_or_else(|| {
                ProtocolError::Malformed("failure envelope has no errorCode".into())
            })?;
            Outcome::Failure { error, error_code }
        };
        Ok(Envelope {
            outcome,
            timestamp: wire.timestamp,
        })
    }
}

impl<T: Serialize> Serialize for Envelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireEnvelope::<T>::deserialize(deserializer)?;
        Envelope::try_from(wire).map_err(serde::de::Error::custom)
    }
}

impl Envelope<Value> {
    /// Parse an envelope from a JSON value, keeping the payload untyped.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        let wire: WireEnvelope<Value> = serde_json::from_value(value)?;
        Envelope::try_from(wire)
    }

    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }
}
