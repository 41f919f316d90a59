//! Physical paper-path states reported by `get-paper-status`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Paper state in the document feeder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaperStatus {
    /// Paper is jammed.
    Jam,
    /// No paper anywhere in the paper path.
    NoPaperStatus,
    /// Paper is loaded and can be scanned.
    ReadyToScan,
    /// A scanned sheet is held and can be ejected.
    ReadyToEject,
    /// Device idle with no paper (voting-terminal mode).
    VtmDevReadyNoPaper,
    /// Only the front sensor sees paper.
    VtmFrontOnly,
    /// Only the back sensor sees paper.
    VtmBackOnly,
    /// Both the front and back sides have paper.
    VtmBothSideHavePaper,
    /// Paper is positioned for scanning (voting-terminal mode).
    VtmReadyToScan,
    /// Paper is held after scanning (voting-terminal mode).
    VtmReadyToEject,
    /// Front and back sensors both see paper and the device is ready.
    VtmFrontAndBackSensorHavePaperReady,
}

impl PaperStatus {
    /// Every known status, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Jam,
        Self::NoPaperStatus,
        Self::ReadyToScan,
        Self::ReadyToEject,
        Self::VtmDevReadyNoPaper,
        Self::VtmFrontOnly,
        Self::VtmBackOnly,
        Self::VtmBothSideHavePaper,
        Self::VtmReadyToScan,
        Self::VtmReadyToEject,
        Self::VtmFrontAndBackSensorHavePaperReady,
    ];

    /// Wire representation, as it appears after `get-paper-status: `.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jam => "PAPER_STATUS_JAM",
            Self::NoPaperStatus => "PAPER_STATUS_NO_PAPER",
            Self::ReadyToScan => "PAPER_STATUS_READY_TO_SCAN",
            Self::ReadyToEject => "PAPER_STATUS_READY_TO_EJECT",
            Self::VtmDevReadyNoPaper => "PAPER_STATUS_VTM_DEV_READY_NO_PAPER",
            Self::VtmFrontOnly => "PAPER_STATUS_VTM_FRONT_ONLY",
            Self::VtmBackOnly => "PAPER_STATUS_VTM_BACK_ONLY",
            Self::VtmBothSideHavePaper => "PAPER_STATUS_VTM_BOTH_SIDE_HAVE_PAPER",
            Self::VtmReadyToScan => "PAPER_STATUS_VTM_READY_TO_SCAN",
            Self::VtmReadyToEject => "PAPER_STATUS_VTM_READY_TO_EJECT",
            Self::VtmFrontAndBackSensorHavePaperReady => {
                "PAPER_STATUS_VTM_FRONT_AND_BACK_SENSOR_HAVE_PAPER_READY"
            }
        }
    }

    /// Whether a sheet is waiting to be scanned.
    #[must_use]
    pub fn is_ready_to_scan(self) -> bool {
        matches!(self, Self::ReadyToScan | Self::VtmReadyToScan)
    }

    /// Whether a scanned sheet is being held for accept/reject.
    #[must_use]
    pub fn is_ready_to_eject(self) -> bool {
        matches!(self, Self::ReadyToEject | Self::VtmReadyToEject)
    }
}

impl Display for PaperStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperStatus {
    type Err = String;

    /// Parse a wire status; unknown values are an error, never a default.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid paper status: {s}"))
    }
}
