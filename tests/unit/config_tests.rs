//! Unit tests for configuration parsing, validation, and save-path resolution.

use std::path::PathBuf;

use plustek_client::config::{ColorMode, FileFormat, PaperSize, ScannerConfig, Source};
use plustek_client::{ClientConfig, ClientError};

const FULL_TOML: &str = r#"
driver_path = "/opt/plustek/bin/plustekctl"

[scanner]
savepath = "/var/scans"
fileformat = "png"
paper_size = "legal"
source = "front"
resolution = 300
mode = "color"
brightness = -20
contrast = 15
multi_detect_feed = false
quality = 90
auto_deskew = true
auto_crop = true
"#;

#[test]
fn empty_toml_uses_defaults() {
    let config = ClientConfig::from_toml_str("").expect("defaults");
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.driver_path, None);
    assert_eq!(config.scanner.resolution, 200);
    assert_eq!(config.scanner.quality, 75);
    assert!(config.scanner.multi_detect_feed);
    assert_eq!(config.scanner.fileformat, FileFormat::Jpg);
    assert_eq!(config.scanner.source, Source::Duplex);
}

#[test]
fn full_toml_parses_every_field() {
    let config = ClientConfig::from_toml_str(FULL_TOML).expect("valid config");
    let scanner = &config.scanner;

    assert_eq!(
        config.driver_path,
        Some(PathBuf::from("/opt/plustek/bin/plustekctl"))
    );
    assert_eq!(scanner.savepath, Some(PathBuf::from("/var/scans")));
    assert_eq!(scanner.fileformat, FileFormat::Png);
    assert_eq!(scanner.paper_size, PaperSize::Legal);
    assert_eq!(scanner.source, Source::Front);
    assert_eq!(scanner.resolution, 300);
    assert_eq!(scanner.mode, ColorMode::Color);
    assert_eq!(scanner.brightness, -20);
    assert_eq!(scanner.contrast, 15);
    assert!(!scanner.multi_detect_feed);
    assert_eq!(scanner.quality, 90);
    assert!(scanner.auto_deskew);
    assert!(scanner.auto_crop);
}

#[test]
fn unsupported_resolution_is_rejected() {
    let err = ClientConfig::from_toml_str("[scanner]\nresolution = 250\n").expect_err("invalid");
    assert!(matches!(err, ClientError::Config(_)));
    assert!(err.to_string().contains("resolution"), "got: {err}");
}

#[test]
fn out_of_range_adjustments_are_rejected() {
    for toml in [
        "[scanner]\nbrightness = 101\n",
        "[scanner]\ncontrast = -101\n",
        "[scanner]\nquality = 0\n",
    ] {
        let err = ClientConfig::from_toml_str(toml).expect_err("out of range");
        assert!(matches!(err, ClientError::Config(_)), "{toml}: {err:?}");
    }
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = ClientConfig::from_toml_str("[scanner\nresolution = ").expect_err("malformed");
    assert!(err.to_string().starts_with("config: invalid config:"), "got: {err}");
}

#[test]
fn unknown_enum_value_is_a_config_error() {
    let err = ClientConfig::from_toml_str("[scanner]\nfileformat = \"gif\"\n").expect_err("gif");
    assert!(matches!(err, ClientError::Config(_)));
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plustek.toml");
    std::fs::write(&path, FULL_TOML).expect("write config");

    let config = ClientConfig::load_from_path(&path).expect("load");
    assert_eq!(config.scanner.resolution, 300);
}

#[test]
fn load_from_missing_path_fails() {
    let err = ClientConfig::load_from_path("/nonexistent/plustek.toml").expect_err("missing");
    assert!(err.to_string().starts_with("config: failed to read config"), "got: {err}");
}

#[test]
fn resolve_keeps_explicit_savepath() {
    let scanner = ScannerConfig {
        savepath: Some(PathBuf::from("/var/scans")),
        ..ScannerConfig::default()
    };

    let resolved = scanner.resolve().expect("resolve");
    assert_eq!(resolved.savepath, PathBuf::from("/var/scans"));
    assert_eq!(resolved.scanner.savepath, Some(PathBuf::from("/var/scans")));
}

#[test]
fn resolve_rejects_out_of_range_options() {
    let scanner = ScannerConfig {
        savepath: Some(PathBuf::from("/var/scans")),
        resolution: 250,
        ..ScannerConfig::default()
    };

    let err = scanner.resolve().expect_err("bad resolution");
    assert!(matches!(err, ClientError::Config(_)), "got: {err:?}");
}

#[test]
fn resolve_creates_temp_savepath() {
    let resolved = ScannerConfig::default().resolve().expect("resolve");

    assert!(resolved.savepath.is_dir());
    assert!(resolved.savepath.starts_with(std::env::temp_dir()));
    assert_eq!(resolved.scanner.savepath.as_ref(), Some(&resolved.savepath));

    std::fs::remove_dir_all(&resolved.savepath).expect("clean up");
}

#[test]
fn discard_removes_only_generated_savepath() {
    let generated = ScannerConfig::default().resolve().expect("resolve");
    assert!(generated.generated);
    generated.discard();
    assert!(!generated.savepath.exists());

    let dir = tempfile::tempdir().expect("tempdir");
    let explicit = ScannerConfig {
        savepath: Some(dir.path().to_path_buf()),
        ..ScannerConfig::default()
    }
    .resolve()
    .expect("resolve");
    assert!(!explicit.generated);
    explicit.discard();
    assert!(dir.path().is_dir());
}

#[test]
fn resolved_config_translates_to_driver_args() {
    let config = ClientConfig::from_toml_str(FULL_TOML).expect("valid config");
    let args = config.scanner.resolve().expect("resolve").to_args();

    assert_eq!(
        args,
        [
            "--savepath",
            "/var/scans",
            "--fileformat",
            "png",
            "--paper-size",
            "legal",
            "--source",
            "front",
            "--resolution",
            "300",
            "--mode",
            "color",
            "--brightness",
            "-20",
            "--contrast",
            "15",
            "--quality",
            "90",
            "--auto-deskew",
            "--auto-crop",
        ]
    );
}

#[test]
fn default_args_enable_multi_feed_detection() {
    let scanner = ScannerConfig {
        savepath: Some(PathBuf::from("/scans")),
        ..ScannerConfig::default()
    };
    let args = scanner.resolve().expect("resolve").to_args();

    assert!(args.iter().any(|a| a == "--multi-detect-feed"));
    assert!(!args.iter().any(|a| a == "--auto-crop"));
}
