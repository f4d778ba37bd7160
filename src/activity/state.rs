//! Activity states and the status published to observers.

use std::fmt;
use std::path::PathBuf;

/// Where the activity is in its lifecycle.
///
/// ```text
/// Uninitialized → PermissionPending → Initializing → Ready ⇄ Capturing
///                        ↓                 ↓
///                 PermissionDenied   CameraUnavailable
///                        ↓
///                    Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityState {
    /// Created, nothing checked yet.
    #[default]
    Uninitialized,
    /// Waiting for the user to answer the permission request.
    PermissionPending,
    /// Fetching a camera provider and binding outputs.
    Initializing,
    /// Bound and idle; triggers take photos.
    Ready,
    /// A photo capture is in flight.
    Capturing,
    /// Binding failed; the activity keeps running without a camera.
    CameraUnavailable,
    /// The user refused camera access.
    PermissionDenied,
    /// Torn down.
    Terminated,
}

impl ActivityState {
    /// True once permission handling is over and the camera either works
    /// or will not.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ActivityState::Ready
                | ActivityState::Capturing
                | ActivityState::CameraUnavailable
                | ActivityState::PermissionDenied
                | ActivityState::Terminated
        )
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityState::Uninitialized => "uninitialized",
            ActivityState::PermissionPending => "permission pending",
            ActivityState::Initializing => "initializing",
            ActivityState::Ready => "ready",
            ActivityState::Capturing => "capturing",
            ActivityState::CameraUnavailable => "camera unavailable",
            ActivityState::PermissionDenied => "permission denied",
            ActivityState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Snapshot published after every state change or finished capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityStatus {
    /// Current lifecycle state.
    pub state: ActivityState,
    /// Capture requests that have finished, saved or failed.
    pub captures_completed: u64,
    /// File shown in the image view.
    pub displayed: Option<PathBuf>,
}
