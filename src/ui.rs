//! UI elements the activity drives.
//!
//! There is no window: the viewfinder reports preview frames through
//! `tracing`, the image view records what it shows and transient notices
//! go to the log.

use crate::capture::Frame;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Destination of live preview frames.
///
/// Rendered from the camera worker thread.
pub trait PreviewSurface: Send + Sync {
    /// Draws one preview frame.
    fn render(&self, frame: &Frame);
}

/// Viewfinder that logs a summary every `log_every` frames.
#[derive(Debug)]
pub struct LogViewfinder {
    frames: AtomicU64,
    log_every: u64,
}

impl LogViewfinder {
    /// Creates a viewfinder logging every `log_every` frames.
    pub fn new(log_every: u64) -> Self {
        Self {
            frames: AtomicU64::new(0),
            log_every: log_every.max(1),
        }
    }

    /// Frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl PreviewSurface for LogViewfinder {
    fn render(&self, frame: &Frame) {
        let rendered = self.frames.fetch_add(1, Ordering::Relaxed) + 1;
        if rendered % self.log_every == 0 {
            tracing::debug!(
                rendered,
                width = frame.width(),
                height = frame.height(),
                luma = format!("{:.1}", frame.mean_luma()),
                "Viewfinder"
            );
        }
    }
}

/// Image display element, hidden until the first photo is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageView {
    visible: bool,
    source: Option<PathBuf>,
    dimensions: Option<(u32, u32)>,
}

impl ImageView {
    /// Creates a hidden, empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the view is shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides the view.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// File currently displayed.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Pixel size of the displayed image, if it could be read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Loads the image at `path` into the view.
    pub fn set_image_uri(&mut self, path: &Path) {
        self.source = Some(path.to_path_buf());
        self.dimensions = match image::image_dimensions(path) {
            Ok(dimensions) => Some(dimensions),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not load image");
                None
            }
        };
    }
}

/// Short-lived user-facing messages.
pub trait Notifier: Send {
    /// Shows `message` briefly.
    fn show_transient(&self, message: &str);
}

/// Notifier that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_transient(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{write_jpeg, BYTES_PER_PIXEL};

    #[test]
    fn test_image_view_starts_hidden() {
        let view = ImageView::new();
        assert!(!view.is_visible());
        assert!(view.source().is_none());
    }

    #[test]
    fn test_image_view_loads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        let frame = Frame::new(vec![128u8; 20 * 10 * BYTES_PER_PIXEL], 20, 10, 1);
        write_jpeg(frame, &path, 80).unwrap();

        let mut view = ImageView::new();
        view.set_visible(true);
        view.set_image_uri(&path);

        assert!(view.is_visible());
        assert_eq!(view.source(), Some(path.as_path()));
        assert_eq!(view.dimensions(), Some((20, 10)));
    }

    #[test]
    fn test_image_view_missing_file() {
        let mut view = ImageView::new();
        view.set_image_uri(Path::new("/nonexistent/photo.jpg"));
        assert!(view.source().is_some());
        assert!(view.dimensions().is_none());
    }

    #[test]
    fn test_viewfinder_counts_frames() {
        let viewfinder = LogViewfinder::new(2);
        let frame = Frame::new(vec![0u8; 2 * 2 * BYTES_PER_PIXEL], 2, 2, 1);
        viewfinder.render(&frame);
        viewfinder.render(&frame);
        viewfinder.render(&frame);
        assert_eq!(viewfinder.frames_rendered(), 3);
    }
}
