//! Still photo capture on user trigger.

mod handler;

pub use handler::{CaptureOutcome, CaptureRequestId, PhotoCaptureHandler};
