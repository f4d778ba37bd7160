//! Camera session: lifecycle scope, worker queue, provider and outputs.
//!
//! ```text
//! start_camera → provider fetch (async) → unbind_all → bind {preview, capture}
//!                                              ↓
//!                                   camera worker thread (device owner)
//! ```

mod controller;
mod lifecycle;
mod provider;
mod use_case;
mod worker;

pub use controller::{CaptureSession, CaptureSessionController};
pub use lifecycle::LifecycleOwner;
pub use provider::{BoundSession, CameraProvider};
pub use use_case::{ImageCapture, Preview};
pub use worker::{BindingId, CameraWorker, WorkerHandle};
