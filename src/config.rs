//! Client configuration parsing, validation, and save-path resolution.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ClientError, Result};

/// Resolutions (DPI) the driver accepts.
pub const SUPPORTED_RESOLUTIONS: &[u32] = &[100, 150, 200, 300, 600];

/// Output image format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    /// JPEG images.
    #[default]
    Jpg,
    /// PNG images.
    Png,
    /// Windows bitmap images.
    Bmp,
    /// TIFF images.
    Tiff,
}

impl FileFormat {
    fn as_arg(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }
}

/// Paper size the scan area is cropped to.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaperSize {
    /// ISO A4.
    A4,
    /// ISO A5.
    A5,
    /// US letter.
    #[default]
    Letter,
    /// US legal.
    Legal,
    /// Let the driver detect the sheet size.
    Auto,
}

impl PaperSize {
    fn as_arg(self) -> &'static str {
        match self {
            Self::A4 => "a4",
            Self::A5 => "a5",
            Self::Letter => "letter",
            Self::Legal => "legal",
            Self::Auto => "auto",
        }
    }
}

/// Which sides of the sheet are imaged.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Front side only.
    Front,
    /// Back side only.
    Back,
    /// Both sides; each scan yields two images.
    #[default]
    Duplex,
}

impl Source {
    fn as_arg(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Duplex => "duplex",
        }
    }
}

/// Color depth of produced images.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// 24-bit color.
    Color,
    /// 8-bit grayscale.
    #[default]
    Gray,
    /// 1-bit black and white.
    Lineart,
}

impl ColorMode {
    fn as_arg(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Gray => "gray",
            Self::Lineart => "lineart",
        }
    }
}

fn default_resolution() -> u32 {
    200
}

fn default_quality() -> u8 {
    75
}

fn default_true() -> bool {
    true
}

/// Options passed to the driver at spawn time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ScannerConfig {
    /// Directory scanned images are written to; a fresh temp dir when unset.
    #[serde(default)]
    pub savepath: Option<PathBuf>,
    /// Output image format.
    #[serde(default)]
    pub fileformat: FileFormat,
    /// Paper size.
    #[serde(default)]
    pub paper_size: PaperSize,
    /// Sides to image.
    #[serde(default)]
    pub source: Source,
    /// Resolution in DPI; one of [`SUPPORTED_RESOLUTIONS`].
    #[serde(default = "default_resolution")]
    pub resolution: u32,
    /// Color mode.
    #[serde(default)]
    pub mode: ColorMode,
    /// Brightness adjustment, -100..=100.
    #[serde(default)]
    pub brightness: i32,
    /// Contrast adjustment, -100..=100.
    #[serde(default)]
    pub contrast: i32,
    /// Ultrasonic multi-feed detection.
    #[serde(default = "default_true")]
    pub multi_detect_feed: bool,
    /// JPEG quality, 1..=100.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Straighten skewed sheets.
    #[serde(default)]
    pub auto_deskew: bool,
    /// Crop images to the detected sheet edges.
    #[serde(default)]
    pub auto_crop: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            savepath: None,
            fileformat: FileFormat::default(),
            paper_size: PaperSize::default(),
            source: Source::default(),
            resolution: default_resolution(),
            mode: ColorMode::default(),
            brightness: 0,
            contrast: 0,
            multi_detect_feed: default_true(),
            quality: default_quality(),
            auto_deskew: false,
            auto_crop: false,
        }
    }
}

impl ScannerConfig {
    /// Check option ranges.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` naming the first out-of-range option.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_RESOLUTIONS.contains(&self.resolution) {
            return Err(ClientError::Config(format!(
                "resolution must be one of {SUPPORTED_RESOLUTIONS:?}, got {}",
                self.resolution
            )));
        }
        if !(-100..=100).contains(&self.brightness) {
            return Err(ClientError::Config(format!(
                "brightness must be within -100..=100, got {}",
                self.brightness
            )));
        }
        if !(-100..=100).contains(&self.contrast) {
            return Err(ClientError::Config(format!(
                "contrast must be within -100..=100, got {}",
                self.contrast
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(ClientError::Config(format!(
                "quality must be within 1..=100, got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// Fix the save path, creating a temporary directory when none is set.
    ///
    /// An explicit save path is kept exactly as given. A generated directory
    /// outlives the client so scanned images stay readable; see
    /// [`ResolvedConfig::discard`] for the failed-connect case.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if an option is out of range, or
    /// `ClientError::Io` if the temporary directory cannot be created.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        self.validate()?;
        let generated = self.savepath.is_none();
        let savepath = match self.savepath.clone() {
            Some(path) => path,
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("plustekctl-")
                    .tempdir()
                    .map_err(|err| {
                        ClientError::Io(format!("failed to create scan directory: {err}"))
                    })?
                    .keep();
                debug!(savepath = %dir.display(), "no savepath configured, using temp dir");
                dir
            }
        };

        Ok(ResolvedConfig {
            scanner: Self {
                savepath: Some(savepath.clone()),
                ..self
            },
            savepath,
            generated,
        })
    }
}

/// Scanner options with the save path fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Directory scanned images are written to.
    pub savepath: PathBuf,
    /// Options, with `savepath` set to the same directory.
    pub scanner: ScannerConfig,
    /// Whether `savepath` is a temp directory created by [`ScannerConfig::resolve`].
    pub generated: bool,
}

impl ResolvedConfig {
    /// Remove a generated save directory that is still empty.
    ///
    /// Used when the driver never started, so nothing was scanned into it.
    /// Explicit save paths are never touched.
    pub fn discard(&self) {
        if !self.generated {
            return;
        }
        if let Err(err) = fs::remove_dir(&self.savepath) {
            debug!(savepath = %self.savepath.display(), %err, "generated savepath not removed");
        }
    }

    /// Translate the options into `plustekctl` command-line arguments.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let s = &self.scanner;
        let mut args = vec![
            "--savepath".to_owned(),
            self.savepath.to_string_lossy().into_owned(),
            "--fileformat".to_owned(),
            s.fileformat.as_arg().to_owned(),
            "--paper-size".to_owned(),
            s.paper_size.as_arg().to_owned(),
            "--source".to_owned(),
            s.source.as_arg().to_owned(),
            "--resolution".to_owned(),
            s.resolution.to_string(),
            "--mode".to_owned(),
            s.mode.as_arg().to_owned(),
            "--brightness".to_owned(),
            s.brightness.to_string(),
            "--contrast".to_owned(),
            s.contrast.to_string(),
            "--quality".to_owned(),
            s.quality.to_string(),
        ];

        for (enabled, flag) in [
            (s.multi_detect_feed, "--multi-detect-feed"),
            (s.auto_deskew, "--auto-deskew"),
            (s.auto_crop, "--auto-crop"),
        ] {
            if enabled {
                args.push(flag.to_owned());
            }
        }

        args
    }
}

/// Top-level configuration parsed from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    /// Explicit path to the `plustekctl` binary; searched on `PATH` when unset.
    #[serde(default)]
    pub driver_path: Option<PathBuf>,
    /// Options passed to the driver.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| ClientError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.scanner.validate()?;
        Ok(config)
    }
}
