//! Raw infrared frames and the per-event arrival object.

use std::fmt;

/// Bytes per infrared sample in the capture format (16-bit little-endian).
pub const BYTES_PER_SAMPLE: usize = 2;

/// A single infrared frame as delivered by a frame source.
///
/// Samples are 16-bit little-endian intensities laid out row-major,
/// `stride` bytes apart. A frame is only meaningful for the duration of
/// the arrival event that carried it.
#[derive(Clone)]
pub struct RawFrame {
    /// Raw sample bytes, `stride * height` (the last row may be unpadded).
    data: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Distance between row starts in bytes.
    stride: usize,
    /// Monotonic sequence number assigned by the source.
    sequence: u64,
}

impl RawFrame {
    /// Creates a tightly packed frame (`stride = width * 2`).
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        let stride = width as usize * BYTES_PER_SAMPLE;
        Self::with_stride(data, width, height, stride, sequence)
    }

    /// Creates a frame whose rows are `stride` bytes apart.
    pub fn with_stride(data: Vec<u8>, width: u32, height: u32, stride: usize, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            stride,
            sequence,
        }
    }

    /// Creates a packed frame from 16-bit samples.
    pub fn from_samples(samples: &[u16], width: u32, height: u32, sequence: u64) -> Self {
        let data = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Self::new(data, width, height, sequence)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Bytes of sample data in one row, excluding padding.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        (self.width as usize).saturating_mul(BYTES_PER_SAMPLE)
    }

    /// Minimum buffer length needed to hold every row.
    ///
    /// Saturates at `usize::MAX`, which no buffer can satisfy.
    pub fn required_len(&self) -> usize {
        match self.height {
            0 => 0,
            h => self
                .stride
                .saturating_mul(h as usize - 1)
                .saturating_add(self.row_bytes()),
        }
    }

    /// Validates that the buffer covers the declared geometry.
    pub fn is_valid(&self) -> bool {
        self.stride >= self.row_bytes() && self.data.len() >= self.required_len()
    }

    /// Locks the sample buffer for reading.
    ///
    /// The returned handle releases the lock when dropped.
    pub fn lock_buffer(&self) -> BufferLock<'_> {
        tracing::trace!(sequence = self.sequence, "Locked frame buffer");
        BufferLock { frame: self }
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("sequence", &self.sequence)
            .field("sample_bytes", &self.data.len())
            .finish()
    }
}

/// Scoped read access to a frame's sample bytes.
pub struct BufferLock<'a> {
    frame: &'a RawFrame,
}

impl BufferLock<'_> {
    /// Returns the locked bytes, including any row padding.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame.data
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.frame.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.frame.stride
    }

    /// True when rows follow each other without padding.
    #[inline]
    pub fn is_packed(&self) -> bool {
        self.frame.stride == self.frame.row_bytes()
    }
}

impl Drop for BufferLock<'_> {
    fn drop(&mut self) {
        tracing::trace!(sequence = self.frame.sequence, "Released frame buffer");
    }
}

/// One frame-arrival notification from a reader.
///
/// The frame may already be gone by the time the event is handled, in
/// which case [`FrameArrival::try_open_frame`] yields `None`.
#[derive(Debug)]
pub struct FrameArrival {
    frame: Option<RawFrame>,
}

impl FrameArrival {
    /// An arrival carrying a frame.
    pub fn new(frame: RawFrame) -> Self {
        Self { frame: Some(frame) }
    }

    /// An arrival whose frame was closed before it could be opened.
    pub fn closed() -> Self {
        Self { frame: None }
    }

    /// Opens the frame, or `None` if it was closed or carries no data.
    pub fn try_open_frame(self) -> Option<RawFrame> {
        self.frame.filter(|frame| !frame.data.is_empty())
    }
}
