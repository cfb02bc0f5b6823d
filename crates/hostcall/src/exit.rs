use std::fmt;
use std::io;

use hostcall_client::ClientError;
use hostcall_host::HostError;
use hostcall_protocol::{ErrorCode, ErrorKind};
use hostcall_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PayloadTooLarge { .. } | TransportError::Json(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn host_error(context: &str, err: HostError) -> CliError {
    match err {
        HostError::Transport(err) => transport_error(context, err),
        HostError::Router(err) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

/// Exit code for an envelope failure carrying `code`.
pub fn remote_exit_code(code: &str) -> i32 {
    match ErrorCode::parse(code).map(ErrorCode::default_kind) {
        Some(ErrorKind::InvalidParams) => DATA_INVALID,
        Some(ErrorKind::PermissionDenied) => PERMISSION_DENIED,
        Some(ErrorKind::Timeout) => TIMEOUT,
        Some(ErrorKind::Network) => TRANSPORT_ERROR,
        _ => FAILURE,
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Unavailable => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        ClientError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::Remote { ref code, .. } => {
            let exit = remote_exit_code(code);
            CliError::new(exit, format!("{context}: [{code}] {err}"))
        }
        ClientError::EmptyData { .. } | ClientError::Protocol(_) | ClientError::Decode(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
