//! Error types for the device registry, simulated sessions and the snapshot store.
//!
//! Every failure surfaced to a caller is reported as an error-type name plus a
//! message, see [`DeviceError::kind`].

use thiserror::Error;

/// Errors that can occur while loading device data or driving a simulated session.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The address is not present in the device registry.
    ///
    /// Raised by `connect`; the session stays disconnected.
    #[error("{0} is unavailable for connection.")]
    Connection(String),

    /// A command or configuration was requested on a session that is not connected.
    #[error("{0} device is offline.")]
    Offline(String),

    /// A device-info document or snapshot file does not parse to a mapping.
    #[error("{0} file has an invalid format.")]
    Format(String),

    /// The device is registered but no session has been persisted for it.
    #[error("{0} has not connected.")]
    NotConnected(String),

    /// The target is neither a registered address nor a device name.
    #[error("{0} is not available.")]
    Unavailable(String),

    /// The operands do not match the command syntax.
    ///
    /// The payload is the usage text that should be shown to the user.
    #[error("{0}")]
    Usage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DeviceError {
    /// Name of the error type as shown in `"<kind>: <message>"` reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceError::Connection(_) => "ConnectionError",
            DeviceError::Offline(_) => "OfflineError",
            DeviceError::Format(_) => "FormatError",
            DeviceError::NotConnected(_) => "NotConnectedError",
            DeviceError::Unavailable(_) => "UnavailableError",
            DeviceError::Usage(_) => "UsageError",
            DeviceError::Io(_) => "IoError",
            DeviceError::Yaml(_) => "YamlError",
            DeviceError::Json(_) => "JsonError",
        }
    }

    /// Formats the error the way the command surface reports it.
    pub fn report(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}
