//! Camera outputs bound into a session.

use super::worker::{BindingId, WorkerHandle};
use crate::capture::DEFAULT_JPEG_QUALITY;
use crate::photo::CaptureOutcome;
use crate::ui::PreviewSurface;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Live preview output.
#[derive(Clone, Default)]
pub struct Preview {
    surface: Option<Arc<dyn PreviewSurface>>,
}

impl Preview {
    /// Creates a preview with no surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes preview frames to `surface`.
    pub fn set_surface_provider(&mut self, surface: Arc<dyn PreviewSurface>) {
        self.surface = Some(surface);
    }

    /// The surface frames are routed to.
    pub fn surface(&self) -> Option<&Arc<dyn PreviewSurface>> {
        self.surface.as_ref()
    }
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preview")
            .field("has_surface", &self.surface.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub(crate) id: BindingId,
    pub(crate) worker: WorkerHandle,
}

/// Still photo output.
#[derive(Debug, Clone)]
pub struct ImageCapture {
    jpeg_quality: u8,
    binding: Option<Binding>,
}

impl ImageCapture {
    /// Creates an unbound output at the default JPEG quality.
    pub fn new() -> Self {
        Self::with_jpeg_quality(DEFAULT_JPEG_QUALITY)
    }

    /// Creates an unbound output at `jpeg_quality`.
    pub fn with_jpeg_quality(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality,
            binding: None,
        }
    }

    /// JPEG quality for saved photos.
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// True once a provider has bound this output to a camera.
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub(crate) fn attach(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    /// Captures one photo into `target` on the camera worker.
    ///
    /// The outcome is delivered through the returned receiver.
    pub fn take_picture(&self, target: PathBuf) -> oneshot::Receiver<CaptureOutcome> {
        match &self.binding {
            Some(binding) => binding
                .worker
                .capture(binding.id, target, self.jpeg_quality),
            None => {
                let (tx, rx) = oneshot::channel();
                let _ = tx.send(CaptureOutcome::failed(
                    "capture output is not bound to a camera",
                ));
                rx
            }
        }
    }
}

impl Default for ImageCapture {
    fn default() -> Self {
        Self::new()
    }
}
