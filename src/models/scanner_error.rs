//! Driver and hardware error codes reported through `err=` response lines.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Closed set of error codes the driver is known to report.
///
/// Each variant corresponds to exactly one wire code; see
/// [`ScannerError::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerError {
    /// Generic driver failure.
    Fail,
    /// A parameter passed to the SDK was rejected.
    InvalidParam,
    /// No scanner device was found on the bus.
    NoDevices,
    /// The device has not been opened.
    DeviceNotOpened,
    /// The device does not support ejecting paper.
    NoSupportEject,
    /// The operation timed out inside the driver.
    Timeout,
    /// Feeding was requested with no paper present.
    PaperStatusNoPaper,
    /// Paper failed to feed.
    PaperStatusErrorFeeding,
    /// Paper is jammed in the feeder.
    PaperStatusJam,
    /// The scanner cover is open.
    PaperStatusCoverOpen,
    /// SANE: operation not supported.
    SaneStatusUnsupported,
    /// SANE: operation was cancelled.
    SaneStatusCancelled,
    /// SANE: device is busy.
    SaneStatusDeviceBusy,
    /// SANE: data or argument is invalid.
    SaneStatusInval,
    /// SANE: no more data available.
    SaneStatusEof,
    /// SANE: document feeder jammed.
    SaneStatusJammed,
    /// SANE: document feeder out of documents.
    SaneStatusNoDocs,
    /// SANE: scanner cover is open.
    SaneStatusCoverOpen,
    /// SANE: error during device I/O.
    SaneStatusIoError,
    /// SANE: out of memory.
    SaneStatusNoMem,
    /// SANE: access to the resource was denied.
    SaneStatusAccessDenied,
}

impl ScannerError {
    /// Every known code, in declaration order.
    pub const ALL: [Self; 21] = [
        Self::Fail,
        Self::InvalidParam,
        Self::NoDevices,
        Self::DeviceNotOpened,
        Self::NoSupportEject,
        Self::Timeout,
        Self::PaperStatusNoPaper,
        Self::PaperStatusErrorFeeding,
        Self::PaperStatusJam,
        Self::PaperStatusCoverOpen,
        Self::SaneStatusUnsupported,
        Self::SaneStatusCancelled,
        Self::SaneStatusDeviceBusy,
        Self::SaneStatusInval,
        Self::SaneStatusEof,
        Self::SaneStatusJammed,
        Self::SaneStatusNoDocs,
        Self::SaneStatusCoverOpen,
        Self::SaneStatusIoError,
        Self::SaneStatusNoMem,
        Self::SaneStatusAccessDenied,
    ];

    /// Wire representation of the code, as it appears after `err=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fail => "PLKSS_ERRCODE_FAIL",
            Self::InvalidParam => "PLKSS_ERRCODE_INVALID_PARAM",
            Self::NoDevices => "PLKSS_ERRCODE_NO_DEVICES",
            Self::DeviceNotOpened => "PLKSS_ERRCODE_DEVICE_NOT_OPENED",
            Self::NoSupportEject => "PLKSS_ERRCODE_NO_SUPPORT_EJECT",
            Self::Timeout => "PLKSS_ERRCODE_TIMEOUT",
            Self::PaperStatusNoPaper => "PLKSS_ERRCODE_PAPER_STATUS_NO_PAPER",
            Self::PaperStatusErrorFeeding => "PLKSS_ERRCODE_PAPER_STATUS_ERROR_FEEDING",
            Self::PaperStatusJam => "PLKSS_ERRCODE_PAPER_STATUS_JAM",
            Self::PaperStatusCoverOpen => "PLKSS_ERRCODE_PAPER_STATUS_COVER_OPEN",
            Self::SaneStatusUnsupported => "PLKSS_ERRCODE_SANE_STATUS_UNSUPPORTED",
            Self::SaneStatusCancelled => "PLKSS_ERRCODE_SANE_STATUS_CANCELLED",
            Self::SaneStatusDeviceBusy => "PLKSS_ERRCODE_SANE_STATUS_DEVICE_BUSY",
            Self::SaneStatusInval => "PLKSS_ERRCODE_SANE_STATUS_INVAL",
            Self::SaneStatusEof => "PLKSS_ERRCODE_SANE_STATUS_EOF",
            Self::SaneStatusJammed => "PLKSS_ERRCODE_SANE_STATUS_JAMMED",
            Self::SaneStatusNoDocs => "PLKSS_ERRCODE_SANE_STATUS_NO_DOCS",
            Self::SaneStatusCoverOpen => "PLKSS_ERRCODE_SANE_STATUS_COVER_OPEN",
            Self::SaneStatusIoError => "PLKSS_ERRCODE_SANE_STATUS_IO_ERROR",
            Self::SaneStatusNoMem => "PLKSS_ERRCODE_SANE_STATUS_NO_MEM",
            Self::SaneStatusAccessDenied => "PLKSS_ERRCODE_SANE_STATUS_ACCESS_DENIED",
        }
    }
}

impl Display for ScannerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScannerError {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| s.to_owned())
    }
}

/// Result of classifying the payload of an `err=` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// A member of the closed [`ScannerError`] set.
    Known(ScannerError),
    /// Anything else, preserved verbatim.
    Unknown(String),
}

impl ErrorCode {
    /// Classify a raw error code string.
    ///
    /// Exact, case-sensitive match against [`ScannerError::ALL`]; anything
    /// else is kept as [`ErrorCode::Unknown`] with the original text.
    #[must_use]
    pub fn classify(raw: &str) -> Self {
        raw.parse::<ScannerError>()
            .map_or_else(Self::Unknown, Self::Known)
    }

    /// The raw wire text of this code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(code) => code.as_str(),
            Self::Unknown(raw) => raw,
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
