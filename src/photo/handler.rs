//! Photo capture handler.

use crate::activity::{ActivityEvent, EventSender};
use crate::metrics::MetricsRegistry;
use crate::session::{ImageCapture, LifecycleOwner};
use crate::storage::{CapturedPhotoFile, OutputDirectory};
use crate::ui::ImageView;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Identifies one accepted capture trigger.
pub type CaptureRequestId = u64;

/// Result of one capture request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The photo was written to `path`.
    Saved {
        /// The written file.
        path: PathBuf,
    },
    /// Nothing usable was written.
    Failed {
        /// Why nothing was written.
        reason: String,
    },
}

impl CaptureOutcome {
    /// A failure with `reason`.
    pub fn failed(reason: impl Into<String>) -> Self {
        CaptureOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// True if a file was written.
    pub fn is_saved(&self) -> bool {
        matches!(self, CaptureOutcome::Saved { .. })
    }
}

/// Turns capture triggers into files on disk and updates the display.
///
/// At most one capture is in flight; triggers arriving while one is
/// pending are dropped.
pub struct PhotoCaptureHandler {
    output: OutputDirectory,
    metrics: Arc<MetricsRegistry>,
    in_flight: Option<CaptureRequestId>,
    next_request: CaptureRequestId,
    saved: Vec<PathBuf>,
    failed: u64,
}

impl PhotoCaptureHandler {
    /// Creates a handler writing into `output`.
    pub fn new(output: OutputDirectory, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            output,
            metrics,
            in_flight: None,
            next_request: 1,
            saved: Vec::new(),
            failed: 0,
        }
    }

    /// Directory photos are written to.
    pub fn output_dir(&self) -> &Path {
        self.output.path()
    }

    /// True while a capture is in flight.
    pub fn is_capturing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Photos saved so far, oldest first.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }

    /// Captures that failed so far.
    pub fn failed_count(&self) -> u64 {
        self.failed
    }

    /// Starts a capture on `image_capture`.
    ///
    /// Returns `None` without side effects when no capture output is bound
    /// or a capture is already in flight. The outcome arrives as
    /// [`ActivityEvent::CaptureFinished`] unless the lifecycle ends first.
    pub fn take_photo(
        &mut self,
        image_capture: Option<&ImageCapture>,
        owner: &LifecycleOwner,
        events: &EventSender,
    ) -> Option<CaptureRequestId> {
        let Some(image_capture) = image_capture else {
            tracing::debug!("Capture requested before the camera is ready");
            return None;
        };
        if let Some(pending) = self.in_flight {
            tracing::debug!(pending, "Capture already in flight, ignoring trigger");
            self.metrics.record_capture_rejected();
            return None;
        }

        let photo = CapturedPhotoFile::now(self.output.path());
        let request = self.next_request;
        self.next_request += 1;
        tracing::debug!(request, path = %photo.path().display(), "Taking photo");

        let result = image_capture.take_picture(photo.into_path());
        let events = events.clone();
        owner.spawn(async move {
            let outcome = result
                .await
                .unwrap_or_else(|_| CaptureOutcome::failed("capture request was dropped"));
            let _ = events.send(ActivityEvent::CaptureFinished { request, outcome });
        });

        self.in_flight = Some(request);
        Some(request)
    }

    /// Applies the outcome of `request` to the display.
    pub fn on_capture_finished(
        &mut self,
        request: CaptureRequestId,
        outcome: CaptureOutcome,
        image_view: &mut ImageView,
    ) {
        if self.in_flight == Some(request) {
            self.in_flight = None;
        } else {
            tracing::debug!(request, "Outcome for a capture that is no longer tracked");
        }

        match outcome {
            CaptureOutcome::Saved { path } => {
                image_view.set_visible(true);
                image_view.set_image_uri(&path);
                self.metrics.record_photo_saved();
                tracing::info!(request, "Photo capture succeeded: {}", path.display());
                self.saved.push(path);
            }
            CaptureOutcome::Failed { reason } => {
                self.failed += 1;
                self.metrics.record_photo_failed();
                tracing::error!(request, "Photo capture failed: {}", reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handler(dir: &Path) -> PhotoCaptureHandler {
        let output = OutputDirectory::resolve(None, "unused", dir).unwrap();
        PhotoCaptureHandler::new(output, Arc::new(MetricsRegistry::new().unwrap()))
    }

    #[tokio::test]
    async fn test_take_photo_before_ready_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(dir.path());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let request = handler.take_photo(None, &LifecycleOwner::new(), &tx);

        assert!(request.is_none());
        assert!(!handler.is_capturing());
        assert!(rx.try_recv().is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_second_trigger_rejected_while_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(dir.path());
        let owner = LifecycleOwner::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let unbound = ImageCapture::new();

        let first = handler.take_photo(Some(&unbound), &owner, &tx);
        let second = handler.take_photo(Some(&unbound), &owner, &tx);
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(handler.metrics.snapshot().captures_rejected, 1);

        // The unbound output fails the request straight away
        match rx.recv().await {
            Some(ActivityEvent::CaptureFinished { request, outcome }) => {
                assert_eq!(Some(request), first);
                let mut view = ImageView::new();
                handler.on_capture_finished(request, outcome, &mut view);
                assert!(!view.is_visible());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(!handler.is_capturing());
        assert_eq!(handler.failed_count(), 1);
    }

    #[test]
    fn test_saved_outcome_updates_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut handler = handler(dir.path());
        let path = dir.path().join("2024-01-01-00-00-00-000.jpg");
        let mut view = ImageView::new();

        handler.on_capture_finished(7, CaptureOutcome::Saved { path: path.clone() }, &mut view);

        assert!(view.is_visible());
        assert_eq!(view.source(), Some(path.as_path()));
        assert_eq!(handler.saved(), &[path]);
        assert_eq!(handler.metrics.snapshot().photos_saved, 1);
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(CaptureOutcome::Saved {
            path: PathBuf::from("a.jpg")
        }
        .is_saved());
        assert_eq!(
            CaptureOutcome::failed("boom"),
            CaptureOutcome::Failed {
                reason: "boom".into()
            }
        );
    }
}
