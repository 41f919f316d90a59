//! Commands understood by the driver on stdin.

use std::fmt::{Display, Formatter};

/// A bare command keyword written to the driver, one per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverCommand {
    /// `get-paper-status`
    GetPaperStatus,
    /// `scan`
    Scan,
    /// `calibrate`
    Calibrate,
    /// `accept`
    Accept,
    /// `reject`
    Reject,
    /// `reject-hold`
    RejectHold,
    /// `quit`
    Quit,
}

impl DriverCommand {
    /// Wire keyword; also the `<command>` prefix of its response lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetPaperStatus => "get-paper-status",
            Self::Scan => "scan",
            Self::Calibrate => "calibrate",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::RejectHold => "reject-hold",
            Self::Quit => "quit",
        }
    }

    /// The `\n`-terminated line written to stdin.
    #[must_use]
    pub fn to_line(self) -> String {
        format!("{}\n", self.as_str())
    }
}

impl Display for DriverCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
