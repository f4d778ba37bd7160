//! Hardware cameras through `nokhwa`.

use super::{Camera, CameraError, CameraInfo, CameraService, CaptureConfig, Frame, LensFacing};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};

/// Camera service over the platform's native capture API.
///
/// Desktop webcams do not report a lens direction, so the configured
/// device is reported as the back camera and every other one as external.
#[derive(Debug, Clone)]
pub struct NokhwaCameraService {
    back_device: u32,
}

impl NokhwaCameraService {
    /// Treats device `back_device` as the rear camera.
    pub fn new(back_device: u32) -> Self {
        Self { back_device }
    }
}

impl CameraService for NokhwaCameraService {
    fn available_cameras(&self) -> Result<Vec<CameraInfo>, CameraError> {
        let devices = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CameraError::DeviceNotFound(e.to_string()))?;

        let cameras = devices
            .iter()
            .filter_map(|device| {
                let index = device.index().as_index().ok()?;
                Some(CameraInfo {
                    index,
                    name: device.human_name(),
                    facing: if index == self.back_device {
                        LensFacing::Back
                    } else {
                        LensFacing::External
                    },
                })
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = cameras.len(), "Enumerated native cameras");
        Ok(cameras)
    }

    fn create(&self, info: &CameraInfo) -> Result<Box<dyn Camera>, CameraError> {
        Ok(Box::new(NokhwaCamera::new(info.index)))
    }
}

/// A single native camera device.
pub struct NokhwaCamera {
    index: u32,
    inner: Option<nokhwa::Camera>,
    sequence: u64,
}

impl NokhwaCamera {
    /// Creates a closed camera for device `index`.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            inner: None,
            sequence: 0,
        }
    }
}

impl Camera for NokhwaCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;

        let format = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let mut camera = nokhwa::Camera::new(CameraIndex::Index(self.index), requested)
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;
        camera
            .open_stream()
            .map_err(|e| CameraError::OpenFailed(e.to_string()))?;

        tracing::info!(
            index = self.index,
            format = ?camera.camera_format(),
            "Native camera opened"
        );
        self.inner = Some(camera);
        self.sequence = 0;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let camera = self.inner.as_mut().ok_or(CameraError::NotInitialized)?;
        let buffer = camera
            .frame()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;

        self.sequence += 1;
        let (width, height) = (decoded.width(), decoded.height());
        Ok(Frame::new(decoded.into_raw(), width, height, self.sequence))
    }

    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.inner.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!(index = self.index, error = %e, "Failed to stop camera stream");
            }
            tracing::info!(index = self.index, "Native camera closed");
        }
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.close();
    }
}
