/// Errors raised when a wire value does not fit the protocol.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A success envelope arrived without a `data` field.
    #[error("success envelope carries no data")]
    MissingData,

    /// The envelope fields are inconsistent with its `success` flag.
    #[error("malformed envelope: {0}")]
    Malformed(String),

    /// A channel identifier is not in the registry.
    #[error(transparent)]
    UnknownChannel(#[from] crate::channel::UnknownChannel),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
