//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics output is not valid UTF-8")]
    Encoding,
}

/// Point-in-time copy of every metric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Whether a camera is currently bound.
    pub camera_bound: bool,
    /// Successful binds.
    pub camera_binds: u64,
    /// Failed binds, including provider failures.
    pub bind_failures: u64,
    /// Photos written to disk.
    pub photos_saved: u64,
    /// Capture requests that failed.
    pub photos_failed: u64,
    /// Triggers dropped because a capture was in flight.
    pub captures_rejected: u64,
    /// Frames delivered to the viewfinder.
    pub preview_frames: u64,
}

/// Prometheus metrics registry for the capture pipeline.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    camera_bound: IntGauge,
    camera_binds: IntCounter,
    bind_failures: IntCounter,

    // Capture metrics
    photos_saved: IntCounter,
    photos_failed: IntCounter,
    captures_rejected: IntCounter,

    // Preview metrics
    preview_frames: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let camera_bound = IntGauge::new(
            "snapcam_camera_bound",
            "Whether a camera is currently bound (1=bound, 0=unbound)",
        )?;
        let camera_binds = IntCounter::new(
            "snapcam_camera_binds_total",
            "Total successful camera binds",
        )?;
        let bind_failures = IntCounter::new(
            "snapcam_bind_failures_total",
            "Total failed camera binds",
        )?;

        let photos_saved = IntCounter::new(
            "snapcam_photos_saved_total",
            "Total photos written to disk",
        )?;
        let photos_failed = IntCounter::new(
            "snapcam_photos_failed_total",
            "Total photo captures that failed",
        )?;
        let captures_rejected = IntCounter::new(
            "snapcam_captures_rejected_total",
            "Capture triggers ignored while another capture was in flight",
        )?;

        let preview_frames = IntCounter::new(
            "snapcam_preview_frames_total",
            "Total frames delivered to the viewfinder",
        )?;

        registry.register(Box::new(camera_bound.clone()))?;
        registry.register(Box::new(camera_binds.clone()))?;
        registry.register(Box::new(bind_failures.clone()))?;
        registry.register(Box::new(photos_saved.clone()))?;
        registry.register(Box::new(photos_failed.clone()))?;
        registry.register(Box::new(captures_rejected.clone()))?;
        registry.register(Box::new(preview_frames.clone()))?;

        Ok(Self {
            registry,
            camera_bound,
            camera_binds,
            bind_failures,
            photos_saved,
            photos_failed,
            captures_rejected,
            preview_frames,
        })
    }

    /// Marks whether a camera is bound.
    pub fn set_camera_bound(&self, bound: bool) {
        self.camera_bound.set(i64::from(bound));
    }

    /// Counts a successful bind.
    pub fn record_bind(&self) {
        self.camera_binds.inc();
    }

    /// Counts a failed bind.
    pub fn record_bind_failure(&self) {
        self.bind_failures.inc();
    }

    /// Counts a photo written to disk.
    pub fn record_photo_saved(&self) {
        self.photos_saved.inc();
    }

    /// Counts a failed capture.
    pub fn record_photo_failed(&self) {
        self.photos_failed.inc();
    }

    /// Counts a trigger ignored during a capture.
    pub fn record_capture_rejected(&self) {
        self.captures_rejected.inc();
    }

    /// Counts a frame delivered to the viewfinder.
    pub fn record_preview_frame(&self) {
        self.preview_frames.inc();
    }

    /// Reads every metric.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            camera_bound: self.camera_bound.get() != 0,
            camera_binds: self.camera_binds.get(),
            bind_failures: self.bind_failures.get(),
            photos_saved: self.photos_saved.get(),
            photos_failed: self.photos_failed.get(),
            captures_rejected: self.captures_rejected.get(),
            preview_frames: self.preview_frames.get(),
        }
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|_| MetricsError::Encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new().unwrap();
        assert_eq!(registry.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_bind();
        registry.record_bind();
        registry.record_photo_saved();
        registry.record_capture_rejected();
        registry.set_camera_bound(true);

        let snapshot = registry.snapshot();
        assert!(snapshot.camera_bound);
        assert_eq!(snapshot.camera_binds, 2);
        assert_eq!(snapshot.photos_saved, 1);
        assert_eq!(snapshot.captures_rejected, 1);
        assert_eq!(snapshot.photos_failed, 0);
    }

    #[test]
    fn test_encode_contains_metric_names() {
        let registry = MetricsRegistry::new().unwrap();
        registry.record_photo_failed();

        let output = registry.encode().unwrap();
        assert!(output.contains("snapcam_photos_failed_total 1"));
        assert!(output.contains("snapcam_camera_bound"));
        assert!(output.contains("snapcam_preview_frames_total"));
    }
}
