//! Error types shared across the client.

use std::fmt::{Display, Formatter};

use crate::models::scanner_error::{ErrorCode, ScannerError};

/// Shared client result type.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error enumeration covering every failure mode of a driver session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Configuration parsing or validation failure, or missing driver binary.
    Config(String),
    /// The driver process could not be spawned.
    Connection(String),
    /// The driver process exited, or the client was already disconnected.
    ///
    /// The message is complete and rendered verbatim.
    Disconnected(String),
    /// The driver emitted text that does not fit the protocol grammar.
    ///
    /// Carries the exact offending text.
    InvalidResponse(String),
    /// The driver reported a known hardware or driver error code.
    Scanner(ScannerError),
    /// Unrecognised error code or unexpected response data, rendered verbatim.
    Generic(String),
    /// File-system or OS call failure.
    Io(String),
}

/// Message of the error returned once the driver connection is gone.
pub const DISCONNECTED_MESSAGE: &str = "client is disconnected";

impl ClientError {
    /// The error every operation resolves with after disconnection.
    #[must_use]
    pub fn disconnected() -> Self {
        Self::Disconnected(DISCONNECTED_MESSAGE.to_owned())
    }

    /// Whether this error means the driver process is gone.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected(_))
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Connection(msg) => write!(f, "connection error: {msg}"),
            Self::InvalidResponse(raw) => write!(f, "invalid response: {raw}"),
            Self::Scanner(code) => write!(f, "{code}"),
            Self::Disconnected(msg) | Self::Generic(msg) => f.write_str(msg),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ErrorCode> for ClientError {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Known(code) => Self::Scanner(code),
            ErrorCode::Unknown(raw) => Self::Generic(raw),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
