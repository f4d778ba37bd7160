//! Events processed by the activity loop.

use crate::capture::CameraError;
use crate::photo::{CaptureOutcome, CaptureRequestId};
use crate::session::CameraProvider;
use tokio::sync::mpsc;

/// Everything that reaches the UI-affine context goes through here.
#[derive(Debug)]
pub enum ActivityEvent {
    /// The capture button was pressed.
    CaptureClicked,
    /// A permission request finished.
    PermissionsResult {
        /// Code the request was issued with.
        request_code: u32,
    },
    /// A camera provider fetch resolved.
    ProviderReady(Result<CameraProvider, CameraError>),
    /// A photo capture finished.
    CaptureFinished {
        /// The trigger this result belongs to.
        request: CaptureRequestId,
        /// What the capture produced.
        outcome: CaptureOutcome,
    },
    /// The activity is being torn down.
    Destroy,
}

/// Posts events to the activity loop.
pub type EventSender = mpsc::UnboundedSender<ActivityEvent>;
