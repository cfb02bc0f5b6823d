//! Channel registry.
//!
//! Every identifier either endpoint may use is a variant of [`Channel`]. The
//! canonical string form is `"<domain>:<operation>"`, e.g. `window:minimize`.
//! Lookups by string are linear in the number of channels and never panic;
//! they exist to catch typo'd channel names during development.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator between domain and operation in a channel identifier.
pub const SEPARATOR: char = ':';

/// IPC protocol version shared by both endpoints.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Feature groups advertised by this protocol version.
pub const SUPPORTED_FEATURES: &[&str] = &[
    "window-control",
    "system-info",
    "file-operations",
    "video-processing",
    "usb-detection",
    "authentication",
    "configuration",
    "logging",
    "auto-update",
];

/// Functional domain a channel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Window,
    System,
    File,
    Video,
    Usb,
    Auth,
    Config,
    Log,
    Update,
}

impl Domain {
    /// All domains in registry order.
    pub const ALL: [Domain; 9] = [
        Domain::Window,
        Domain::System,
        Domain::File,
        Domain::Video,
        Domain::Usb,
        Domain::Auth,
        Domain::Config,
        Domain::Log,
        Domain::Update,
    ];

    /// Domain prefix used in channel identifiers.
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Window => "window",
            Domain::System => "system",
            Domain::File => "file",
            Domain::Video => "video",
            Domain::Usb => "usb",
            Domain::Auth => "auth",
            Domain::Config => "config",
            Domain::Log => "log",
            Domain::Update => "update",
        }
    }

    /// Upper-case group name (`WINDOW`, `SYSTEM`, ...).
    pub fn group_name(self) -> &'static str {
        match self {
            Domain::Window => "WINDOW",
            Domain::System => "SYSTEM",
            Domain::File => "FILE",
            Domain::Video => "VIDEO",
            Domain::Usb => "USB",
            Domain::Auth => "AUTH",
            Domain::Config => "CONFIG",
            Domain::Log => "LOG",
            Domain::Update => "UPDATE",
        }
    }

    /// Parse a domain prefix.
    pub fn parse(name: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|domain| domain.as_str() == name)
    }

    /// Channels registered under this domain, in registry order.
    pub fn channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL
            .iter()
            .copied()
            .filter(move |channel| channel.domain() == self)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a channel carries calls or one-way notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Request/response: every call yields exactly one envelope.
    Invoke,
    /// Host-published notification; never answered with an envelope.
    Event,
}

macro_rules! channels {
    ($( $variant:ident => ($domain:ident, $id:literal, $kind:ident), )*) => {
        /// A registered IPC channel.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Channel {
            $( $variant, )*
        }

        impl Channel {
            /// Every registered channel, grouped by domain.
            pub const ALL: &'static [Channel] = &[ $( Channel::$variant, )* ];

            /// Canonical identifier string.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Channel::$variant => $id, )*
                }
            }

            pub fn domain(self) -> Domain {
                match self {
                    $( Channel::$variant => Domain::$domain, )*
                }
            }

            pub fn kind(self) -> ChannelKind {
                match self {
                    $( Channel::$variant => ChannelKind::$kind, )*
                }
            }
        }
    };
}

channels! {
    WindowMinimize => (Window, "window:minimize", Invoke),
    WindowMaximize => (Window, "window:maximize", Invoke),
    WindowClose => (Window, "window:close", Invoke),
    WindowHide => (Window, "window:hide", Invoke),
    WindowShow => (Window, "window:show", Invoke),
    WindowGetState => (Window, "window:get-state", Invoke),
    WindowSetBounds => (Window, "window:set-bounds", Invoke),
    WindowStateChanged => (Window, "window:state-changed", Event),

    SystemInfo => (System, "system:info", Invoke),
    SystemAppVersion => (System, "system:app-version", Invoke),
    SystemPerformance => (System, "system:performance", Invoke),
    SystemPerformanceUpdate => (System, "system:performance-update", Event),

    FileOpenDialog => (File, "file:open-dialog", Invoke),
    FileSaveDialog => (File, "file:save-dialog", Invoke),
    FileRead => (File, "file:read", Invoke),
    FileWrite => (File, "file:write", Invoke),
    FileDelete => (File, "file:delete", Invoke),
    FileGetInfo => (File, "file:get-info", Invoke),
    FileExists => (File, "file:exists", Invoke),
    FileCreateDir => (File, "file:create-dir", Invoke),
    FileListDir => (File, "file:list-dir", Invoke),

    VideoEncrypt => (Video, "video:encrypt", Invoke),
    VideoDecrypt => (Video, "video:decrypt", Invoke),
    VideoGetInfo => (Video, "video:get-info", Invoke),
    VideoProcessProgress => (Video, "video:process-progress", Event),
    VideoProcessComplete => (Video, "video:process-complete", Event),
    VideoProcessError => (Video, "video:process-error", Event),

    UsbGetDevices => (Usb, "usb:get-devices", Invoke),
    UsbDeviceAdded => (Usb, "usb:device-added", Event),
    UsbDeviceRemoved => (Usb, "usb:device-removed", Event),
    UsbVerifyDevice => (Usb, "usb:verify-device", Invoke),
    UsbGetCapacity => (Usb, "usb:get-capacity", Invoke),

    AuthVerifyPassword => (Auth, "auth:verify-password", Invoke),
    AuthCreateSession => (Auth, "auth:create-session", Invoke),
    AuthDestroySession => (Auth, "auth:destroy-session", Invoke),
    AuthGetSession => (Auth, "auth:get-session", Invoke),
    AuthSessionExpired => (Auth, "auth:session-expired", Event),

    ConfigGet => (Config, "config:get", Invoke),
    ConfigSet => (Config, "config:set", Invoke),
    ConfigReset => (Config, "config:reset", Invoke),
    ConfigChanged => (Config, "config:changed", Event),

    LogWrite => (Log, "log:write", Invoke),
    LogGetPath => (Log, "log:get-path", Invoke),
    LogClean => (Log, "log:clean", Invoke),

    UpdateCheck => (Update, "update:check", Invoke),
    UpdateDownload => (Update, "update:download", Invoke),
    UpdateInstall => (Update, "update:install", Invoke),
    UpdateAvailable => (Update, "update:available", Event),
    UpdateDownloaded => (Update, "update:downloaded", Event),
    UpdateProgress => (Update, "update:progress", Event),
}

impl Channel {
    /// Look up a channel by its identifier string.
    pub fn parse(identifier: &str) -> Option<Channel> {
        Channel::ALL
            .iter()
            .copied()
            .find(|channel| channel.as_str() == identifier)
    }

    /// Look up a channel by domain and operation names.
    pub fn from_parts(domain: &str, operation: &str) -> Option<Channel> {
        let domain = Domain::parse(domain)?;
        domain
            .channels()
            .find(|channel| channel.operation() == operation)
    }

    /// Operation part of the identifier (after the separator).
    pub fn operation(self) -> &'static str {
        let id = self.as_str();
        match id.split_once(SEPARATOR) {
            Some((_, operation)) => operation,
            None => id,
        }
    }

    pub fn is_event(self) -> bool {
        self.kind() == ChannelKind::Event
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unregistered channel identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unregistered channel '{0}'")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::parse(s).ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Build the canonical identifier for a domain and operation.
///
/// The result is not checked against the registry; use [`is_valid_channel`]
/// for that.
pub fn identifier(domain: Domain, operation: &str) -> String {
    format!("{}{SEPARATOR}{operation}", domain.as_str())
}

/// Returns true if `identifier` names a registered channel.
pub fn is_valid_channel(identifier: &str) -> bool {
    Channel::parse(identifier).is_some()
}

/// Returns the domain group of a registered channel, or `None`.
pub fn channel_group(identifier: &str) -> Option<Domain> {
    Channel::parse(identifier).map(Channel::domain)
}
