//! Double-buffered RGBA frame storage.

use std::fmt;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Solid colour painted into the initial front buffer (green).
pub const FRONT_SEED: [u8; 4] = [0x00, 0xFF, 0x00, 0xFF];

/// Solid colour painted into the initial back buffer (blue).
pub const BACK_SEED: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// A fixed-size RGBA image buffer.
///
/// The length is always `4 * width * height`; the storage is allocated
/// once and only ever overwritten in place.
#[derive(Clone, PartialEq, Eq)]
pub struct ColorBuffer {
    pixels: Box<[u8]>,
    width: u32,
    height: u32,
}

impl ColorBuffer {
    /// Allocates a zeroed buffer.
    ///
    /// # Panics
    ///
    /// Panics if `4 * width * height` overflows `usize`. Dimensions from a
    /// frame source go through [`try_new`](Self::try_new) instead.
    pub fn new(width: u32, height: u32) -> Self {
        match Self::try_new(width, height) {
            Some(buffer) => buffer,
            None => panic!("{width}x{height} RGBA buffer overflows usize"),
        }
    }

    /// Allocates a zeroed buffer, or `None` if its length overflows `usize`.
    pub fn try_new(width: u32, height: u32) -> Option<Self> {
        let len = Self::byte_len(width, height)?;
        Some(Self {
            pixels: vec![0u8; len].into_boxed_slice(),
            width,
            height,
        })
    }

    /// `4 * width * height`, if it fits in `usize`.
    pub fn byte_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(BYTES_PER_PIXEL)
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
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Mutable view of the pixels. The slice cannot grow or shrink.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Paints every pixel with `rgba`.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for pixel in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            pixel.copy_from_slice(&rgba);
        }
    }

    /// Returns the pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = ((y as usize) * (self.width as usize) + x as usize) * BYTES_PER_PIXEL;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[start..start + BYTES_PER_PIXEL]);
        Some(rgba)
    }
}

impl fmt::Debug for ColorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Identifies one of the two buffers of a [`FrameBufferPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferSlot {
    First,
    Second,
}

impl BufferSlot {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            BufferSlot::First => 0,
            BufferSlot::Second => 1,
        }
    }

    /// The opposite slot.
    #[inline]
    pub fn other(self) -> Self {
        match self {
            BufferSlot::First => BufferSlot::Second,
            BufferSlot::Second => BufferSlot::First,
        }
    }
}

/// Two equally sized buffers with a front/back role flag.
///
/// The front buffer is bound for display and safe to read for export;
/// the back buffer is written by the capture path. [`swap`](Self::swap)
/// is the only operation that changes which is which.
pub struct FrameBufferPair {
    buffers: [ColorBuffer; 2],
    front: BufferSlot,
    swaps: u64,
}

impl FrameBufferPair {
    /// Allocates two zeroed buffers; the first slot starts as front.
    ///
    /// # Panics
    ///
    /// Same as [`ColorBuffer::new`].
    pub fn create(width: u32, height: u32) -> Self {
        Self::from_buffers(ColorBuffer::new(width, height), ColorBuffer::new(width, height))
    }

    /// Like [`create`](Self::create), but `None` when the buffer length
    /// overflows `usize`.
    pub fn try_create(width: u32, height: u32) -> Option<Self> {
        let first = ColorBuffer::try_new(width, height)?;
        let second = first.clone();
        Some(Self::from_buffers(first, second))
    }

    /// Like [`create`](Self::create), with the front painted
    /// [`FRONT_SEED`] and the back painted [`BACK_SEED`].
    pub fn with_test_pattern(width: u32, height: u32) -> Self {
        let mut pair = Self::create(width, height);
        pair.seed_test_pattern();
        pair
    }

    /// Paints the front [`FRONT_SEED`] and the back [`BACK_SEED`].
    pub fn seed_test_pattern(&mut self) {
        self.front_mut().fill(FRONT_SEED);
        self.back_mut().fill(BACK_SEED);
    }

    fn from_buffers(first: ColorBuffer, second: ColorBuffer) -> Self {
        Self {
            buffers: [first, second],
            front: BufferSlot::First,
            swaps: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buffers[0].width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buffers[0].height()
    }

    #[inline]
    pub fn front_slot(&self) -> BufferSlot {
        self.front
    }

    #[inline]
    pub fn back_slot(&self) -> BufferSlot {
        self.front.other()
    }

    /// The buffer currently bound for display and export.
    #[inline]
    pub fn front(&self) -> &ColorBuffer {
        &self.buffers[self.front.index()]
    }

    /// The buffer being written. Not for export.
    #[inline]
    pub fn back(&self) -> &ColorBuffer {
        &self.buffers[self.back_slot().index()]
    }

    #[inline]
    pub fn back_mut(&mut self) -> &mut ColorBuffer {
        let slot = self.back_slot();
        &mut self.buffers[slot.index()]
    }

    fn front_mut(&mut self) -> &mut ColorBuffer {
        &mut self.buffers[self.front.index()]
    }

    /// Flips the roles: the back buffer becomes front and vice versa.
    pub fn swap(&mut self) {
        self.front = self.front.other();
        self.swaps += 1;
    }

    /// Number of swaps performed since creation.
    #[inline]
    pub fn swap_count(&self) -> u64 {
        self.swaps
    }
}

impl fmt::Debug for FrameBufferPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBufferPair")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("front", &self.front)
            .field("swaps", &self.swaps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_create_allocates_two_distinct_buffers() {
        let pair = FrameBufferPair::create(3, 2);

        assert_eq!(pair.front().len(), 4 * 3 * 2);
        assert_eq!(pair.back().len(), 4 * 3 * 2);
        assert!(!std::ptr::eq(pair.front(), pair.back()));
        assert_ne!(pair.front_slot(), pair.back_slot());
        assert!(pair.front().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_swap_exchanges_roles() {
        let mut pair = FrameBufferPair::create(1, 1);
        pair.back_mut().fill([1, 2, 3, 4]);

        pair.swap();

        assert_eq!(pair.front().pixel(0, 0), Some([1, 2, 3, 4]));
        assert_eq!(pair.back().pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(pair.front_slot(), BufferSlot::Second);
        assert_eq!(pair.swap_count(), 1);
    }

    #[test]
    fn test_test_pattern_seeds() {
        let pair = FrameBufferPair::with_test_pattern(2, 2);
        assert_eq!(pair.front().pixel(1, 1), Some(FRONT_SEED));
        assert_eq!(pair.back().pixel(0, 0), Some(BACK_SEED));
    }

    #[test]
    fn test_oversized_dimensions_are_rejected() {
        assert_eq!(ColorBuffer::byte_len(3, 2), Some(24));
        assert_eq!(ColorBuffer::byte_len(u32::MAX, u32::MAX), None);
        assert!(ColorBuffer::try_new(u32::MAX, u32::MAX).is_none());
        assert!(FrameBufferPair::try_create(u32::MAX, u32::MAX).is_none());
    }

    #[test]
    fn test_pixel_out_of_range() {
        let buffer = ColorBuffer::new(2, 2);
        assert_eq!(buffer.pixel(2, 0), None);
        assert_eq!(buffer.pixel(0, 2), None);
    }

    #[test]
    fn test_fill_keeps_length() {
        let mut buffer = ColorBuffer::new(5, 5);
        let before = buffer.as_bytes().as_ptr();
        buffer.fill([1, 1, 1, 1]);
        assert_eq!(buffer.len(), 100);
        assert_eq!(buffer.as_bytes().as_ptr(), before);
    }

    proptest! {
        #[test]
        fn prop_double_swap_restores_roles(w in 0u32..16, h in 0u32..16) {
            let mut pair = FrameBufferPair::create(w, h);
            let front = pair.front() as *const ColorBuffer;
            let back = pair.back() as *const ColorBuffer;

            pair.swap();
            pair.swap();

            prop_assert!(std::ptr::eq(pair.front(), front));
            prop_assert!(std::ptr::eq(pair.back(), back));
        }
    }
}
