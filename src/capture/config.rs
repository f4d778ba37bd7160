//! Camera capture configuration.
//!
//! The file format mirrors the runtime components: `[capture]` for the
//! bound device, `[storage]` for where photos land, `[permissions]` for
//! how camera access is decided and `[output]` for the metrics exporter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::encoder::DEFAULT_JPEG_QUALITY;

/// Configuration for camera capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index treated as the rear camera.
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target preview frames per second.
    pub fps: u32,
    /// JPEG quality for saved photos (1-100).
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(ConfigError::InvalidQuality(self.jpeg_quality));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    #[error("invalid jpeg quality {0} (must be 1-100)")]
    InvalidQuality(u8),
    #[error("app name must be a single non-empty path component")]
    InvalidAppName,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Camera and encoding settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Photo output location.
    #[serde(default)]
    pub storage: StorageConfig,
    /// How permissions are decided.
    #[serde(default)]
    pub permissions: PermissionConfig,
    /// Metrics exporter settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where captured photos are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Subdirectory created under the external media root.
    pub app_name: String,
    /// External media root; the user's pictures directory when unset.
    pub external_media_dir: Option<PathBuf>,
    /// Internal fallback directory; the local data directory when unset.
    pub internal_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            app_name: "snapcam".to_string(),
            external_media_dir: None,
            internal_dir: None,
        }
    }
}

impl StorageConfig {
    /// External media root after applying platform defaults.
    pub fn external_media_root(&self) -> Option<PathBuf> {
        self.external_media_dir.clone().or_else(dirs::picture_dir)
    }

    /// Internal fallback directory after applying platform defaults.
    pub fn internal_dir(&self) -> PathBuf {
        self.internal_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join(&self.app_name))
                .unwrap_or_else(|| PathBuf::from(&self.app_name))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut components = Path::new(&self.app_name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(_)), None) => Ok(()),
            _ => Err(ConfigError::InvalidAppName),
        }
    }
}

/// How camera access is decided at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPolicy {
    /// Treat camera access as already granted.
    Granted,
    /// Treat camera access as refused.
    Denied,
    /// Ask on the terminal.
    #[default]
    Prompt,
    /// Ask the operating system (requires the `camera` feature).
    System,
}

impl fmt::Display for PermissionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PermissionPolicy::Granted => "granted",
            PermissionPolicy::Denied => "denied",
            PermissionPolicy::Prompt => "prompt",
            PermissionPolicy::System => "system",
        };
        f.write_str(name)
    }
}

impl FromStr for PermissionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "granted" => Ok(PermissionPolicy::Granted),
            "denied" => Ok(PermissionPolicy::Denied),
            "prompt" => Ok(PermissionPolicy::Prompt),
            "system" => Ok(PermissionPolicy::System),
            other => Err(format!(
                "unknown permission policy '{other}' (expected granted, denied, prompt or system)"
            )),
        }
    }
}

/// Permission configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Policy for the camera permission.
    pub camera: PermissionPolicy,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { metrics_port: 9090 }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capture.validate()?;
        self.storage.validate()
    }
}
