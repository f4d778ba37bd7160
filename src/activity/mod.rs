//! The camera activity: a single UI-affine event loop.
//!
//! All permission handling, session binding and display updates run on
//! the loop inside [`CameraActivity::run`]. Background work (permission
//! prompts, provider fetches, captures) posts its result back as an
//! [`ActivityEvent`], scoped to the activity's [`LifecycleOwner`].

mod event;
mod state;

pub use event::{ActivityEvent, EventSender};
pub use state::{ActivityState, ActivityStatus};

use crate::capture::{CameraError, CameraService, CaptureConfig, ConfigError};
use crate::metrics::MetricsRegistry;
use crate::permission::{GateDecision, PermissionGate, PermissionRegistry};
use crate::photo::{CaptureOutcome, CaptureRequestId, PhotoCaptureHandler};
use crate::session::{CameraProvider, CameraWorker, CaptureSessionController, LifecycleOwner};
use crate::storage::OutputDirectory;
use crate::ui::{ImageView, Notifier, PreviewSurface};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Notice shown when the user refuses camera access.
pub const PERMISSION_DENIED_MESSAGE: &str = "Permissions not granted by the user.";

/// Errors that prevent the activity from starting.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// The capture configuration was rejected.
    #[error("invalid capture configuration: {0}")]
    Config(#[from] ConfigError),
    /// The camera worker could not be started.
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Collaborators the activity is built from.
pub struct ActivityOptions {
    /// Preview and capture settings.
    pub capture: CaptureConfig,
    /// Where photos are written.
    pub output: OutputDirectory,
    /// Source of camera devices.
    pub service: Arc<dyn CameraService>,
    /// Permission backend consulted by the gate.
    pub permissions: Arc<dyn PermissionRegistry>,
    /// Receives preview frames.
    pub viewfinder: Arc<dyn PreviewSurface>,
    /// Shows transient notices.
    pub notifier: Box<dyn Notifier>,
    /// Shared metrics registry.
    pub metrics: Arc<MetricsRegistry>,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityExit {
    /// Destroyed by its owner or because every handle was dropped.
    Destroyed,
    /// The user refused a required permission.
    PermissionDenied,
}

/// What the activity left behind.
#[derive(Debug, Clone)]
pub struct ActivityReport {
    /// Why the loop stopped.
    pub exit: ActivityExit,
    /// Final state of the image view.
    pub image_view: ImageView,
    /// Photos saved, oldest first.
    pub saved: Vec<PathBuf>,
    /// Captures that failed.
    pub failed: u64,
}

/// Remote control for a running activity.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    events: EventSender,
    status: watch::Receiver<ActivityStatus>,
}

impl ActivityHandle {
    /// Presses the capture button. Returns false once the activity is gone.
    pub fn click(&self) -> bool {
        self.events.send(ActivityEvent::CaptureClicked).is_ok()
    }

    /// Asks the activity to shut down.
    pub fn destroy(&self) {
        let _ = self.events.send(ActivityEvent::Destroy);
    }

    /// Sender side of the event queue.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Latest published status.
    pub fn status(&self) -> ActivityStatus {
        self.status.borrow().clone()
    }

    /// Waits until the published status satisfies `condition`.
    ///
    /// Returns `None` if the activity finished without reaching it.
    pub async fn wait_for(
        &mut self,
        condition: impl FnMut(&ActivityStatus) -> bool,
    ) -> Option<ActivityStatus> {
        self.status
            .wait_for(condition)
            .await
            .ok()
            .map(|status| status.clone())
    }
}

/// Owns the permission gate, session controller and photo handler, and
/// drives them from one event queue.
pub struct CameraActivity {
    lifecycle: LifecycleOwner,
    gate: PermissionGate,
    controller: CaptureSessionController,
    handler: PhotoCaptureHandler,
    image_view: ImageView,
    notifier: Box<dyn Notifier>,
    worker: Option<CameraWorker>,
    /// Held until `run` starts; afterwards only handles keep the queue open.
    events_tx: Option<EventSender>,
    events_weak: mpsc::WeakUnboundedSender<ActivityEvent>,
    events_rx: mpsc::UnboundedReceiver<ActivityEvent>,
    status: watch::Sender<ActivityStatus>,
    metrics: Arc<MetricsRegistry>,
}

impl CameraActivity {
    /// Builds the activity and starts the camera worker.
    pub fn new(options: ActivityOptions) -> Result<Self, ActivityError> {
        options.capture.validate()?;

        let worker = CameraWorker::spawn(
            Arc::clone(&options.service),
            Arc::clone(&options.metrics),
        )?;
        let controller = CaptureSessionController::new(
            options.service,
            worker.handle(),
            options.capture,
            options.viewfinder,
            Arc::clone(&options.metrics),
        );
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(ActivityStatus::default());

        Ok(Self {
            lifecycle: LifecycleOwner::new(),
            gate: PermissionGate::new(options.permissions),
            controller,
            handler: PhotoCaptureHandler::new(options.output, Arc::clone(&options.metrics)),
            image_view: ImageView::new(),
            notifier: options.notifier,
            worker: Some(worker),
            events_weak: events_tx.downgrade(),
            events_tx: Some(events_tx),
            events_rx,
            status,
            metrics: options.metrics,
        })
    }

    /// Returns a handle for sending input and observing status.
    ///
    /// The loop stops once every handle and every pending continuation
    /// has been dropped.
    pub fn handle(&self) -> ActivityHandle {
        let events = match &self.events_tx {
            Some(events) => events.clone(),
            None => mpsc::unbounded_channel().0,
        };
        ActivityHandle {
            events,
            status: self.status.subscribe(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActivityState {
        self.status.borrow().state
    }

    /// Runs the activity until it is destroyed, permission is refused or
    /// nothing can reach it any more.
    pub async fn run(mut self) -> ActivityReport {
        self.on_create();
        self.events_tx = None;

        let exit = loop {
            let Some(event) = self.events_rx.recv().await else {
                break ActivityExit::Destroyed;
            };
            if let ControlFlow::Break(exit) = self.dispatch(event).await {
                break exit;
            }
        };

        self.on_destroy(exit).await
    }

    fn on_create(&mut self) {
        tracing::info!(
            output = %self.handler.output_dir().display(),
            "Camera activity created"
        );
        if self.gate.all_permissions_granted() {
            self.start_camera();
        } else {
            self.set_state(ActivityState::PermissionPending);
            if let Some(events) = self.events() {
                self.gate.request_permissions(&self.lifecycle, &events);
            }
        }
    }

    async fn dispatch(&mut self, event: ActivityEvent) -> ControlFlow<ActivityExit> {
        match event {
            ActivityEvent::CaptureClicked => self.take_photo(),
            ActivityEvent::PermissionsResult { request_code } => {
                match self.gate.on_request_permissions_result(request_code) {
                    GateDecision::Ignored => {}
                    GateDecision::Granted => self.start_camera(),
                    GateDecision::Denied => {
                        self.set_state(ActivityState::PermissionDenied);
                        self.notifier.show_transient(PERMISSION_DENIED_MESSAGE);
                        return ControlFlow::Break(ActivityExit::PermissionDenied);
                    }
                }
            }
            ActivityEvent::ProviderReady(provider) => self.on_provider_ready(provider).await,
            ActivityEvent::CaptureFinished { request, outcome } => {
                self.on_capture_finished(request, outcome)
            }
            ActivityEvent::Destroy => return ControlFlow::Break(ActivityExit::Destroyed),
        }
        ControlFlow::Continue(())
    }

    fn start_camera(&mut self) {
        self.set_state(ActivityState::Initializing);
        if let Some(events) = self.events() {
            self.controller.start_camera(&self.lifecycle, &events);
        }
    }

    async fn on_provider_ready(&mut self, provider: Result<CameraProvider, CameraError>) {
        let bound = match provider {
            Ok(provider) => self
                .controller
                .on_provider_ready(&self.lifecycle, provider)
                .await
                .is_ok(),
            Err(e) => {
                self.metrics.record_bind_failure();
                tracing::error!(error = %e, "Camera provider unavailable");
                false
            }
        };

        let state = match (bound, self.handler.is_capturing()) {
            (true, true) => ActivityState::Capturing,
            (true, false) => ActivityState::Ready,
            (false, _) => ActivityState::CameraUnavailable,
        };
        self.set_state(state);
    }

    fn take_photo(&mut self) {
        let Some(events) = self.events() else {
            return;
        };
        let request =
            self.handler
                .take_photo(self.controller.image_capture(), &self.lifecycle, &events);
        if request.is_some() {
            self.set_state(ActivityState::Capturing);
        }
    }

    fn on_capture_finished(&mut self, request: CaptureRequestId, outcome: CaptureOutcome) {
        self.handler
            .on_capture_finished(request, outcome, &mut self.image_view);

        let displayed = self.image_view.source().map(|path| path.to_path_buf());
        let ready = self.state() == ActivityState::Capturing && !self.handler.is_capturing();
        self.status.send_modify(|status| {
            status.captures_completed += 1;
            status.displayed = displayed;
            if ready {
                status.state = ActivityState::Ready;
            }
        });
    }

    async fn on_destroy(mut self, exit: ActivityExit) -> ActivityReport {
        self.lifecycle.destroy();
        self.controller.unbind();
        if let Some(worker) = self.worker.take() {
            if tokio::task::spawn_blocking(move || worker.shutdown())
                .await
                .is_err()
            {
                tracing::error!("Camera worker shutdown task failed");
            }
        }
        self.set_state(ActivityState::Terminated);

        tracing::info!(
            ?exit,
            saved = self.handler.saved().len(),
            failed = self.handler.failed_count(),
            "Camera activity finished"
        );
        ActivityReport {
            exit,
            image_view: self.image_view,
            saved: self.handler.saved().to_vec(),
            failed: self.handler.failed_count(),
        }
    }

    /// A sender for continuations, if anything still holds the queue open.
    fn events(&self) -> Option<EventSender> {
        self.events_weak.upgrade()
    }

    fn set_state(&self, state: ActivityState) {
        self.status.send_if_modified(|status| {
            if status.state == state {
                return false;
            }
            tracing::debug!(from = %status.state, to = %state, "Activity state");
            status.state = state;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CameraInfo, LensFacing, MockCameraService, MockCameraStats};
    use crate::permission::{MemoryPermissions, Permission, PermissionStatus};
    use crate::storage::CapturedPhotoFile;
    use crate::ui::LogViewfinder;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    #[derive(Clone, Default)]
    struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

    impl Notifier for RecordingNotifier {
        fn show_transient(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    struct Harness {
        handle: ActivityHandle,
        run: JoinHandle<ActivityReport>,
        stats: Arc<MockCameraStats>,
        notices: RecordingNotifier,
        metrics: Arc<MetricsRegistry>,
        dir: tempfile::TempDir,
    }

    fn launch(service: MockCameraService, permissions: MemoryPermissions) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDirectory::resolve(None, "snapcam", dir.path()).unwrap();
        let stats = service.stats();
        let notices = RecordingNotifier::default();
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        let activity = CameraActivity::new(ActivityOptions {
            capture: CaptureConfig::with_dimensions(32, 24),
            output,
            service: Arc::new(service),
            permissions: Arc::new(permissions),
            viewfinder: Arc::new(LogViewfinder::new(30)),
            notifier: Box::new(notices.clone()),
            metrics: Arc::clone(&metrics),
        })
        .unwrap();
        let handle = activity.handle();
        Harness {
            handle,
            run: tokio::spawn(activity.run()),
            stats,
            notices,
            metrics,
            dir,
        }
    }

    fn granted() -> MemoryPermissions {
        MemoryPermissions::new().with_status(Permission::Camera, PermissionStatus::Granted)
    }

    fn photos_in(dir: &std::path::Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    #[tokio::test]
    async fn test_granted_permission_reaches_ready() {
        let mut h = launch(MockCameraService::new(), granted());

        let status = h.handle.wait_for(|s| s.state.is_settled()).await.unwrap();
        assert_eq!(status.state, ActivityState::Ready);
        assert_eq!(h.stats.open_devices(), 1);

        h.handle.destroy();
        let report = h.run.await.unwrap();
        assert_eq!(report.exit, ActivityExit::Destroyed);
        assert_eq!(h.stats.open_devices(), 0);
        assert_eq!(h.handle.status().state, ActivityState::Terminated);
    }

    #[tokio::test]
    async fn test_dropping_every_handle_stops_activity() {
        let Harness {
            mut handle,
            run,
            stats,
            dir: _dir,
            ..
        } = launch(MockCameraService::new(), granted());
        handle.wait_for(|s| s.state == ActivityState::Ready).await.unwrap();
        assert_eq!(stats.open_devices(), 1);

        drop(handle);
        let report = tokio::time::timeout(Duration::from_secs(3), run)
            .await
            .expect("activity kept running without handles")
            .unwrap();

        assert_eq!(report.exit, ActivityExit::Destroyed);
        assert_eq!(stats.open_devices(), 0);
    }

    #[tokio::test]
    async fn test_capture_saves_one_named_file_and_displays_it() {
        let mut h = launch(MockCameraService::new(), granted());
        h.handle.wait_for(|s| s.state == ActivityState::Ready).await.unwrap();

        assert!(h.handle.click());
        let status = h
            .handle
            .wait_for(|s| s.captures_completed == 1)
            .await
            .unwrap();

        let files = photos_in(h.dir.path());
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_str().unwrap();
        assert!(CapturedPhotoFile::is_photo_name(name), "{name}");
        assert_eq!(status.displayed.as_deref(), Some(files[0].as_path()));
        assert_eq!(status.state, ActivityState::Ready);

        h.handle.destroy();
        let report = h.run.await.unwrap();
        assert!(report.image_view.is_visible());
        assert_eq!(report.image_view.source(), Some(files[0].as_path()));
        assert_eq!(report.image_view.dimensions(), Some((32, 24)));
        assert_eq!(report.saved, files);
        assert_eq!(h.metrics.snapshot().photos_saved, 1);
    }

    #[tokio::test]
    async fn test_denied_permission_terminates_without_binding() {
        let h = launch(MockCameraService::new(), MemoryPermissions::new());

        let report = h.run.await.unwrap();

        assert_eq!(report.exit, ActivityExit::PermissionDenied);
        assert_eq!(h.stats.opened_total(), 0);
        assert_eq!(h.metrics.snapshot().camera_binds, 0);
        assert_eq!(
            h.notices.0.lock().unwrap().as_slice(),
            [PERMISSION_DENIED_MESSAGE.to_string()]
        );
        assert_eq!(h.handle.status().state, ActivityState::Terminated);
    }

    #[tokio::test]
    async fn test_permission_granted_on_request_starts_camera() {
        let mut h = launch(
            MockCameraService::new(),
            MemoryPermissions::new().granting_on_request(),
        );

        let status = h.handle.wait_for(|s| s.state.is_settled()).await.unwrap();
        assert_eq!(status.state, ActivityState::Ready);
        assert_eq!(h.stats.opened_total(), 1);

        h.handle.destroy();
        h.run.await.unwrap();
    }

    #[tokio::test]
    async fn test_foreign_permission_result_ignored() {
        let mut h = launch(MockCameraService::new(), granted());
        h.handle.wait_for(|s| s.state == ActivityState::Ready).await.unwrap();

        h.handle
            .events()
            .send(ActivityEvent::PermissionsResult { request_code: 99 })
            .unwrap();
        h.handle.destroy();

        let report = h.run.await.unwrap();
        assert_eq!(report.exit, ActivityExit::Destroyed);
        assert!(h.notices.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bind_failure_keeps_running_without_camera() {
        let service = MockCameraService::with_cameras(vec![CameraInfo {
            index: 0,
            name: "Front only".into(),
            facing: LensFacing::Front,
        }]);
        let mut h = launch(service, granted());

        let status = h.handle.wait_for(|s| s.state.is_settled()).await.unwrap();
        assert_eq!(status.state, ActivityState::CameraUnavailable);

        // Triggers are no-ops without a bound capture output
        h.handle.click();
        h.handle.destroy();
        let report = h.run.await.unwrap();

        assert_eq!(report.exit, ActivityExit::Destroyed);
        assert!(report.saved.is_empty());
        assert_eq!(report.failed, 0);
        assert!(photos_in(h.dir.path()).is_empty());
        assert!(h.notices.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_click_before_ready_is_noop() {
        let h = launch(MockCameraService::new(), MemoryPermissions::new());
        // Queued ahead of the permission answer
        h.handle.click();

        let report = h.run.await.unwrap();
        assert!(report.saved.is_empty());
        assert!(!report.image_view.is_visible());
        assert!(photos_in(h.dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_capture_is_logged_only() {
        let mut h = launch(MockCameraService::new().failing_captures(), granted());
        h.handle.wait_for(|s| s.state == ActivityState::Ready).await.unwrap();

        h.handle.click();
        h.handle
            .wait_for(|s| s.captures_completed == 1)
            .await
            .unwrap();

        h.handle.destroy();
        let report = h.run.await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!report.image_view.is_visible());
        assert!(photos_in(h.dir.path()).is_empty());
        assert!(h.notices.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rapid_taps_capture_once() {
        let mut h = launch(MockCameraService::new(), granted());
        h.handle.wait_for(|s| s.state == ActivityState::Ready).await.unwrap();

        h.handle.click();
        h.handle.click();
        h.handle.click();
        h.handle
            .wait_for(|s| s.captures_completed >= 1 && s.state == ActivityState::Ready)
            .await
            .unwrap();

        h.handle.destroy();
        let report = h.run.await.unwrap();
        let rejected = h.metrics.snapshot().captures_rejected;
        assert_eq!(report.saved.len() as u64 + rejected, 3);
        assert_eq!(photos_in(h.dir.path()).len(), report.saved.len());
    }
}
