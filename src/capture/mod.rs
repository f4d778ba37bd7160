//! Camera input, frame handling and photo encoding.
//!
//! This module provides the device-level abstractions the capture session
//! binds to, plus the configuration file that drives the whole crate.

mod camera;
mod config;
mod encoder;
mod frame;
#[cfg(feature = "camera")]
mod nokhwa_backend;

pub use camera::{
    Camera, CameraError, CameraInfo, CameraSelector, CameraService, LensFacing, MockCamera,
    MockCameraService, MockCameraStats,
};
pub use config::{
    CaptureConfig, ConfigError, FileConfig, OutputConfig, PermissionConfig, PermissionPolicy,
    StorageConfig,
};
pub use encoder::{write_jpeg, EncodeError, DEFAULT_JPEG_QUALITY};
pub use frame::{Frame, BYTES_PER_PIXEL};
#[cfg(feature = "camera")]
pub use nokhwa_backend::{NokhwaCamera, NokhwaCameraService};
