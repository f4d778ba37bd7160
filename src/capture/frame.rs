//! Frame type representing a captured image with metadata.

/// Bytes per pixel of a packed RGB8 frame.
pub const BYTES_PER_PIXEL: usize = 3;

/// A single captured frame from the camera.
///
/// Pixels are packed RGB8, row-major, no padding between rows.
#[derive(Clone)]
pub struct Frame {
    /// Raw RGB pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Monotonic sequence number since the device was opened.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
        }
    }

    /// Returns a reference to the raw pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Consumes the frame and returns its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixel_count() > 0 && self.pixels.len() == self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Average Rec. 601 luma over the frame, 0.0 to 255.0.
    pub fn mean_luma(&self) -> f64 {
        let count = self.pixels.len() / BYTES_PER_PIXEL;
        if count == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .pixels
            .chunks_exact(BYTES_PER_PIXEL)
            .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
            .sum();
        sum / count as f64
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}
