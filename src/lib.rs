//! Snapcam Library
//!
//! A permission-gated camera activity: live preview plus still photo
//! capture to JPEG files.
//!
//! # Architecture
//!
//! ```text
//! permission gate → capture session → photo capture → image view
//!        ↓                 ↓                ↓
//!             activity event loop (single consumer)
//!                          ↓
//!              camera worker thread (device owner)
//! ```
//!
//! # Design Principles
//!
//! - **Permissions first**: no camera is touched until every required
//!   permission is granted
//! - **One loop owns the UI**: permission results, bindings and captures
//!   are applied in order on the activity's event loop
//! - **Lifecycle-scoped work**: callbacks arriving after teardown are dropped
//! - **Never overwrite**: every photo gets a fresh timestamped file
//!
//! # Example
//!
//! ```no_run
//! use snapcam::{
//!     activity::{ActivityOptions, ActivityState, CameraActivity},
//!     capture::{CaptureConfig, MockCameraService},
//!     metrics::MetricsRegistry,
//!     permission::{MemoryPermissions, Permission, PermissionStatus},
//!     storage::OutputDirectory,
//!     ui::{LogNotifier, LogViewfinder},
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let output = OutputDirectory::resolve(None, "snapcam", "/tmp/snapcam".as_ref()).unwrap();
//! let activity = CameraActivity::new(ActivityOptions {
//!     capture: CaptureConfig::default(),
//!     output,
//!     service: Arc::new(MockCameraService::new()),
//!     permissions: Arc::new(
//!         MemoryPermissions::new().with_status(Permission::Camera, PermissionStatus::Granted),
//!     ),
//!     viewfinder: Arc::new(LogViewfinder::new(30)),
//!     notifier: Box::new(LogNotifier),
//!     metrics: Arc::new(MetricsRegistry::new().unwrap()),
//! })
//! .unwrap();
//!
//! let mut handle = activity.handle();
//! let run = tokio::spawn(activity.run());
//!
//! handle.wait_for(|s| s.state == ActivityState::Ready).await;
//! handle.click();
//! handle.wait_for(|s| s.captures_completed == 1).await;
//! handle.destroy();
//!
//! let report = run.await.unwrap();
//! println!("saved {:?}", report.saved);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod activity;
pub mod capture;
pub mod metrics;
pub mod permission;
pub mod photo;
pub mod session;
pub mod storage;
pub mod ui;

// Re-export commonly used types at crate root
pub use activity::{ActivityHandle, ActivityOptions, ActivityReport, ActivityState, CameraActivity};
pub use capture::{Camera, CameraService, CaptureConfig, FileConfig, Frame, MockCameraService};
pub use metrics::MetricsRegistry;
pub use permission::{PermissionGate, PermissionRegistry};
pub use photo::PhotoCaptureHandler;
pub use session::{CaptureSessionController, LifecycleOwner};
pub use storage::{CapturedPhotoFile, OutputDirectory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
