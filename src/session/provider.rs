//! Camera provider: device enumeration and lifecycle binding.

use super::use_case::{Binding, ImageCapture, Preview};
use super::worker::{BindingId, WorkerHandle};
use super::LifecycleOwner;
use crate::capture::{CameraError, CameraInfo, CameraSelector, CameraService, CaptureConfig};
use std::sync::Arc;

/// Access to the host's cameras, resolved asynchronously.
#[derive(Debug, Clone)]
pub struct CameraProvider {
    cameras: Vec<CameraInfo>,
    worker: WorkerHandle,
    config: CaptureConfig,
}

/// A successful bind of outputs to a camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSession {
    id: BindingId,
    camera: CameraInfo,
}

impl BoundSession {
    /// Identifier of the binding.
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// The camera the outputs are bound to.
    pub fn camera(&self) -> &CameraInfo {
        &self.camera
    }
}

impl CameraProvider {
    /// Enumerates devices on the blocking pool.
    pub async fn get_instance(
        service: Arc<dyn CameraService>,
        worker: WorkerHandle,
        config: CaptureConfig,
    ) -> Result<Self, CameraError> {
        let cameras = tokio::task::spawn_blocking(move || service.available_cameras())
            .await
            .map_err(|e| CameraError::WorkerUnavailable(e.to_string()))??;

        tracing::debug!(count = cameras.len(), "Camera provider ready");
        Ok(Self {
            cameras,
            worker,
            config,
        })
    }

    /// Cameras found when the provider was created.
    pub fn available_cameras(&self) -> &[CameraInfo] {
        &self.cameras
    }

    /// Releases every bound output. Safe to call when nothing is bound.
    pub fn unbind_all(&self) {
        self.worker.unbind_all();
    }

    /// Binds `preview` and `image_capture` to the camera chosen by `selector`
    /// for as long as `owner` lives.
    pub async fn bind_to_lifecycle(
        &self,
        owner: &LifecycleOwner,
        selector: CameraSelector,
        preview: &Preview,
        image_capture: &mut ImageCapture,
    ) -> Result<BoundSession, CameraError> {
        if owner.is_destroyed() {
            return Err(CameraError::LifecycleDestroyed);
        }
        let camera = selector
            .select(&self.cameras)
            .cloned()
            .ok_or(CameraError::NoMatchingCamera(selector.facing()))?;

        let id = self
            .worker
            .bind(camera.clone(), self.config.clone(), preview.surface().cloned())
            .await?;
        image_capture.attach(Binding {
            id,
            worker: self.worker.clone(),
        });

        Ok(BoundSession { id, camera })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{LensFacing, MockCameraService};
    use crate::metrics::MetricsRegistry;
    use crate::session::CameraWorker;

    fn worker(service: Arc<dyn CameraService>) -> CameraWorker {
        CameraWorker::spawn(service, Arc::new(MetricsRegistry::new().unwrap())).unwrap()
    }

    #[tokio::test]
    async fn test_bind_attaches_capture_output() {
        let service: Arc<dyn CameraService> = Arc::new(MockCameraService::new());
        let worker = worker(Arc::clone(&service));
        let provider = CameraProvider::get_instance(
            service,
            worker.handle(),
            CaptureConfig::with_dimensions(16, 16),
        )
        .await
        .unwrap();
        assert_eq!(provider.available_cameras().len(), 2);

        let mut capture = ImageCapture::new();
        let session = provider
            .bind_to_lifecycle(
                &LifecycleOwner::new(),
                CameraSelector::DEFAULT_BACK_CAMERA,
                &Preview::new(),
                &mut capture,
            )
            .await
            .unwrap();

        assert!(capture.is_bound());
        assert_eq!(session.camera().facing, LensFacing::Back);
    }

    #[tokio::test]
    async fn test_bind_fails_after_lifecycle_destroyed() {
        let service: Arc<dyn CameraService> = Arc::new(MockCameraService::new());
        let worker = worker(Arc::clone(&service));
        let provider =
            CameraProvider::get_instance(service, worker.handle(), CaptureConfig::default())
                .await
                .unwrap();
        let owner = LifecycleOwner::new();
        owner.destroy();

        let mut capture = ImageCapture::new();
        let result = provider
            .bind_to_lifecycle(
                &owner,
                CameraSelector::DEFAULT_BACK_CAMERA,
                &Preview::new(),
                &mut capture,
            )
            .await;

        assert!(matches!(result, Err(CameraError::LifecycleDestroyed)));
        assert!(!capture.is_bound());
    }

    #[tokio::test]
    async fn test_bind_without_back_camera() {
        let service: Arc<dyn CameraService> =
            Arc::new(MockCameraService::with_cameras(vec![CameraInfo {
                index: 0,
                name: "Front only".into(),
                facing: LensFacing::Front,
            }]));
        let worker = worker(Arc::clone(&service));
        let provider =
            CameraProvider::get_instance(service, worker.handle(), CaptureConfig::default())
                .await
                .unwrap();

        let result = provider
            .bind_to_lifecycle(
                &LifecycleOwner::new(),
                CameraSelector::DEFAULT_BACK_CAMERA,
                &Preview::new(),
                &mut ImageCapture::new(),
            )
            .await;

        assert!(matches!(
            result,
            Err(CameraError::NoMatchingCamera(LensFacing::Back))
        ));
    }
}
