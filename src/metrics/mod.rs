//! Prometheus metrics for the capture pipeline.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `snapcam_camera_bound` - Whether a camera is bound (1=bound, 0=unbound)
//! - `snapcam_camera_binds_total` - Successful camera binds
//! - `snapcam_bind_failures_total` - Failed camera binds
//!
//! ## Capture Metrics
//! - `snapcam_photos_saved_total` - Photos written to disk
//! - `snapcam_photos_failed_total` - Captures that failed
//! - `snapcam_captures_rejected_total` - Triggers ignored during a capture
//!
//! ## Preview Metrics
//! - `snapcam_preview_frames_total` - Frames delivered to the viewfinder
//!
//! With the `metrics` feature the registry can be served over HTTP at
//! `/metrics`.
//!
//! # Example
//!
//! ```no_run
//! use snapcam::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.record_photo_saved();
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
