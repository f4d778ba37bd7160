//! Camera abstraction for frame capture.
//!
//! A [`CameraService`] enumerates devices and creates [`Camera`] instances.
//! Devices are only ever touched from the camera worker thread, so
//! [`Camera`] implementations do not need to be `Send`.

use super::{CaptureConfig, Frame, BYTES_PER_PIXEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),
    #[error("no {0} camera available")]
    NoMatchingCamera(LensFacing),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    #[error("camera not initialized")]
    NotInitialized,
    #[error("lifecycle owner is already destroyed")]
    LifecycleDestroyed,
    #[error("camera worker unavailable: {0}")]
    WorkerUnavailable(String),
}

/// Which way a camera lens points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    /// Rear-facing camera.
    Back,
    /// Front-facing camera.
    Front,
    /// Detachable or unknown orientation.
    External,
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LensFacing::Back => "back",
            LensFacing::Front => "front",
            LensFacing::External => "external",
        };
        f.write_str(name)
    }
}

/// A device as reported by a [`CameraService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    /// Backend-specific device index.
    pub index: u32,
    /// Human readable name.
    pub name: String,
    /// Lens direction.
    pub facing: LensFacing,
}

/// Chooses the device a session binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSelector {
    facing: LensFacing,
}

impl CameraSelector {
    /// The first rear-facing camera.
    pub const DEFAULT_BACK_CAMERA: Self = Self {
        facing: LensFacing::Back,
    };

    /// The first front-facing camera.
    pub const DEFAULT_FRONT_CAMERA: Self = Self {
        facing: LensFacing::Front,
    };

    /// Returns the lens direction this selector requires.
    pub fn facing(&self) -> LensFacing {
        self.facing
    }

    /// Picks the first camera matching this selector.
    pub fn select<'a>(&self, cameras: &'a [CameraInfo]) -> Option<&'a CameraInfo> {
        cameras.iter().find(|camera| camera.facing == self.facing)
    }
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait Camera {
    /// Opens and initializes the camera with the given configuration.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Captures a single frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Checks if the camera is currently open.
    fn is_open(&self) -> bool;

    /// Closes the camera and releases resources.
    fn close(&mut self);
}

/// Access to the camera devices of the host.
pub trait CameraService: Send + Sync {
    /// Enumerates the available cameras. May block.
    fn available_cameras(&self) -> Result<Vec<CameraInfo>, CameraError>;

    /// Creates an unopened device for `info`.
    fn create(&self, info: &CameraInfo) -> Result<Box<dyn Camera>, CameraError>;
}

/// Counters shared between a [`MockCameraService`] and its cameras.
#[derive(Debug, Default)]
pub struct MockCameraStats {
    open: AtomicUsize,
    opened_total: AtomicUsize,
    frames: AtomicU64,
}

impl MockCameraStats {
    /// Devices currently open.
    pub fn open_devices(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Devices opened over the lifetime of the service.
    pub fn opened_total(&self) -> usize {
        self.opened_total.load(Ordering::SeqCst)
    }

    /// Frames produced by all devices.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }
}

/// Mock camera for testing that generates synthetic frames.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    sequence: u64,
    stats: Option<Arc<MockCameraStats>>,
    fail_capture: bool,
}

impl MockCamera {
    /// Creates a closed mock camera with no shared stats.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_stats(stats: Arc<MockCameraStats>, fail_capture: bool) -> Self {
        Self {
            stats: Some(stats),
            fail_capture,
            ..Self::default()
        }
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        if self.config.is_none() {
            if let Some(stats) = &self.stats {
                stats.open.fetch_add(1, Ordering::SeqCst);
                stats.opened_total.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!("MockCamera opened with config: {:?}", config);
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        if self.fail_capture {
            return Err(CameraError::CaptureFailed("sensor timeout".into()));
        }

        // Diagonal gradient that drifts with the sequence number
        let (width, height) = (config.width, config.height);
        let shift = self.sequence as u32;
        let mut pixels = Vec::with_capacity((width * height) as usize * BYTES_PER_PIXEL);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x + shift) % 256) as u8);
                pixels.push(((y + shift) % 256) as u8);
                pixels.push(((x + y) % 256) as u8);
            }
        }

        self.sequence += 1;
        if let Some(stats) = &self.stats {
            stats.frames.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Frame::new(pixels, width, height, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        if self.config.take().is_some() {
            if let Some(stats) = &self.stats {
                stats.open.fetch_sub(1, Ordering::SeqCst);
            }
            tracing::info!("MockCamera closed");
        }
    }
}

/// Camera service backed by [`MockCamera`] devices.
#[derive(Debug)]
pub struct MockCameraService {
    cameras: Vec<CameraInfo>,
    stats: Arc<MockCameraStats>,
    fail_capture: bool,
}

impl MockCameraService {
    /// A service with one back and one front synthetic camera.
    pub fn new() -> Self {
        Self::with_cameras(vec![
            CameraInfo {
                index: 0,
                name: "Mock back camera".into(),
                facing: LensFacing::Back,
            },
            CameraInfo {
                index: 1,
                name: "Mock front camera".into(),
                facing: LensFacing::Front,
            },
        ])
    }

    /// A service exposing exactly `cameras`.
    pub fn with_cameras(cameras: Vec<CameraInfo>) -> Self {
        Self {
            cameras,
            stats: Arc::new(MockCameraStats::default()),
            fail_capture: false,
        }
    }

    /// Makes every capture on devices created from now on fail.
    pub fn failing_captures(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    /// Shared device counters.
    pub fn stats(&self) -> Arc<MockCameraStats> {
        Arc::clone(&self.stats)
    }
}

impl Default for MockCameraService {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraService for MockCameraService {
    fn available_cameras(&self) -> Result<Vec<CameraInfo>, CameraError> {
        Ok(self.cameras.clone())
    }

    fn create(&self, info: &CameraInfo) -> Result<Box<dyn Camera>, CameraError> {
        if !self.cameras.contains(info) {
            return Err(CameraError::DeviceNotFound(info.name.clone()));
        }
        Ok(Box::new(MockCamera::with_stats(
            Arc::clone(&self.stats),
            self.fail_capture,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> CaptureConfig {
        CaptureConfig::with_dimensions(32, 24)
    }

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let config = small_config();

        assert!(!camera.is_open());

        camera.open(&config).unwrap();
        assert!(camera.is_open());

        let frame = camera.capture().unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        let frame2 = camera.capture().unwrap();
        assert_eq!(frame2.sequence(), 2);

        camera.close();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_selector_picks_matching_facing() {
        let service = MockCameraService::new();
        let cameras = service.available_cameras().unwrap();

        let back = CameraSelector::DEFAULT_BACK_CAMERA.select(&cameras).unwrap();
        assert_eq!(back.facing, LensFacing::Back);

        let front = CameraSelector::DEFAULT_FRONT_CAMERA.select(&cameras).unwrap();
        assert_eq!(front.index, 1);
    }

    #[test]
    fn test_selector_without_match() {
        let cameras = vec![CameraInfo {
            index: 3,
            name: "USB".into(),
            facing: LensFacing::External,
        }];
        assert!(CameraSelector::DEFAULT_BACK_CAMERA.select(&cameras).is_none());
    }

    #[test]
    fn test_service_tracks_open_devices() {
        let service = MockCameraService::new();
        let stats = service.stats();
        let info = service.available_cameras().unwrap()[0].clone();

        let mut camera = service.create(&info).unwrap();
        camera.open(&small_config()).unwrap();
        assert_eq!(stats.open_devices(), 1);

        camera.capture().unwrap();
        assert_eq!(stats.frames(), 1);

        camera.close();
        camera.close();
        assert_eq!(stats.open_devices(), 0);
        assert_eq!(stats.opened_total(), 1);
    }

    #[test]
    fn test_failing_captures() {
        let service = MockCameraService::new().failing_captures();
        let info = service.available_cameras().unwrap()[0].clone();
        let mut camera = service.create(&info).unwrap();
        camera.open(&small_config()).unwrap();

        assert!(matches!(
            camera.capture(),
            Err(CameraError::CaptureFailed(_))
        ));
    }
}
