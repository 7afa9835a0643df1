//! Frame container handed from the frame source to the per-frame computation.
//!
//! - `Frame`: owned RGB pixel buffer plus dimensions and capture sequence number.
//! - `FrameView`: borrowed, read-only view that collaborators (landmark detector,
//!   emotion classifier) receive. They never take ownership of the pixels.
//!
//! Frames are transient: one is produced per loop tick and dropped at the end
//! of that tick. Nothing in this crate stores frames across ticks.

/// Bytes per pixel for the packed RGB layout every source produces.
pub const RGB_CHANNELS: usize = 3;

/// One captured camera frame (packed RGB, row-major).
pub struct Frame {
    pixels: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Monotonic sequence number assigned by the source (1-based).
    pub sequence: u64,
}

impl Frame {
    /// Create a new frame. Called by frame sources.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            sequence,
        }
    }

    /// Read-only view for collaborators.
    pub fn view(&self) -> FrameView<'_> {
        FrameView { frame: self }
    }

    /// Expected byte length for a packed RGB frame of this size.
    pub fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * RGB_CHANNELS
    }
}

/// Borrowed view of a frame.
///
/// Collaborators get dimensions and pixels, nothing else. The lifetime ties
/// the view to the tick that produced the frame.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn sequence(&self) -> u64 {
        self.frame.sequence
    }

    pub fn pixels(&self) -> &'a [u8] {
        &self.frame.pixels
    }

    /// RGB triple at `(x, y)`, or `None` outside the frame or on a short buffer.
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.frame.width || y >= self.frame.height {
            return None;
        }
        let idx = ((y as usize) * (self.frame.width as usize) + x as usize) * RGB_CHANNELS;
        let px = self.frame.pixels.get(idx..idx + RGB_CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }
}
