//! Capture session controller.
//!
//! Owns the one live [`CaptureSession`]. Every (re)start fetches a
//! provider, builds fresh outputs, unbinds whatever was bound and binds
//! the new outputs. A failed bind leaves the controller without a session.

use super::provider::{BoundSession, CameraProvider};
use super::use_case::{ImageCapture, Preview};
use super::worker::WorkerHandle;
use super::LifecycleOwner;
use crate::activity::{ActivityEvent, EventSender};
use crate::capture::{CameraError, CameraSelector, CameraService, CaptureConfig};
use crate::metrics::MetricsRegistry;
use crate::ui::PreviewSurface;
use std::sync::Arc;

/// Outputs bound together under one camera.
#[derive(Debug)]
pub struct CaptureSession {
    /// Live preview output.
    pub preview: Preview,
    /// Still photo output.
    pub image_capture: ImageCapture,
    /// The binding both outputs share.
    pub bound: BoundSession,
}

/// Starts the camera and owns the bound session.
pub struct CaptureSessionController {
    service: Arc<dyn CameraService>,
    worker: WorkerHandle,
    config: CaptureConfig,
    viewfinder: Arc<dyn PreviewSurface>,
    metrics: Arc<MetricsRegistry>,
    session: Option<CaptureSession>,
}

impl CaptureSessionController {
    /// Creates a controller with no session.
    pub fn new(
        service: Arc<dyn CameraService>,
        worker: WorkerHandle,
        config: CaptureConfig,
        viewfinder: Arc<dyn PreviewSurface>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            service,
            worker,
            config,
            viewfinder,
            metrics,
            session: None,
        }
    }

    /// Fetches a camera provider without blocking.
    ///
    /// The provider arrives on the activity loop as
    /// [`ActivityEvent::ProviderReady`] unless the lifecycle ends first.
    pub fn start_camera(&self, owner: &LifecycleOwner, events: &EventSender) {
        let fetch = CameraProvider::get_instance(
            Arc::clone(&self.service),
            self.worker.clone(),
            self.config.clone(),
        );
        let events = events.clone();
        owner.spawn(async move {
            let provider = fetch.await;
            let _ = events.send(ActivityEvent::ProviderReady(provider));
        });
        tracing::debug!("Camera provider requested");
    }

    /// Builds and binds a new session on `provider`.
    pub async fn on_provider_ready(
        &mut self,
        owner: &LifecycleOwner,
        provider: CameraProvider,
    ) -> Result<(), CameraError> {
        let mut preview = Preview::new();
        preview.set_surface_provider(Arc::clone(&self.viewfinder));

        let mut image_capture = ImageCapture::with_jpeg_quality(self.config.jpeg_quality);
        let selector = CameraSelector::DEFAULT_BACK_CAMERA;

        provider.unbind_all();
        self.session = None;

        match provider
            .bind_to_lifecycle(owner, selector, &preview, &mut image_capture)
            .await
        {
            Ok(bound) => {
                self.metrics.record_bind();
                tracing::info!(
                    binding = bound.id(),
                    camera = %bound.camera().name,
                    "Use cases bound to lifecycle"
                );
                self.session = Some(CaptureSession {
                    preview,
                    image_capture,
                    bound,
                });
                Ok(())
            }
            Err(e) => {
                self.metrics.record_bind_failure();
                tracing::error!(error = %e, "Use case binding failed");
                Err(e)
            }
        }
    }

    /// The bound session, if any.
    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    /// The bound capture output, if the camera is ready.
    pub fn image_capture(&self) -> Option<&ImageCapture> {
        self.session.as_ref().map(|session| &session.image_capture)
    }

    /// Drops the session and releases the camera.
    pub fn unbind(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("Capture session released");
        }
        self.worker.unbind_all();
    }
}
