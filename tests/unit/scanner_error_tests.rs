//! Unit tests for driver error-code classification.

use plustek_client::{ErrorCode, ScannerError};

#[test]
fn every_known_code_classifies_to_itself() {
    for code in ScannerError::ALL {
        assert_eq!(ErrorCode::classify(code.as_str()), ErrorCode::Known(code));
    }
}

#[test]
fn unknown_code_keeps_raw_text() {
    let code = ErrorCode::classify("WHAT??");
    assert_eq!(code, ErrorCode::Unknown("WHAT??".into()));
    assert_eq!(code.as_str(), "WHAT??");
    assert_eq!(code.to_string(), "WHAT??");
}

#[test]
fn classification_requires_exact_match() {
    for raw in [
        "",
        " PLKSS_ERRCODE_FAIL",
        "PLKSS_ERRCODE_FAIL ",
        "PLKSS_ERRCODE_PAPER_STATUS",
    ] {
        assert!(
            matches!(ErrorCode::classify(raw), ErrorCode::Unknown(ref s) if s == raw),
            "{raw:?}"
        );
    }
}

#[test]
fn scanner_error_parses_from_wire_code() {
    let code: ScannerError = "PLKSS_ERRCODE_SANE_STATUS_DEVICE_BUSY".parse().expect("known");
    assert_eq!(code, ScannerError::SaneStatusDeviceBusy);
    assert_eq!(code.to_string(), "PLKSS_ERRCODE_SANE_STATUS_DEVICE_BUSY");
}
