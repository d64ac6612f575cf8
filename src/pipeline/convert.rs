//! Infrared sample to RGBA conversion.
//!
//! Each 16-bit sample is reduced to one intensity byte which is
//! replicated into R, G and B with an opaque alpha. All bounds are
//! checked before the destination is touched, so a failed conversion
//! leaves the destination exactly as it was.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::buffers::{ColorBuffer, BYTES_PER_PIXEL};
use crate::capture::{BufferLock, BYTES_PER_SAMPLE};

/// Errors that can occur during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("source buffer underrun: need {needed} bytes, have {available}")]
    BufferUnderrun { needed: usize, available: usize },
    #[error("destination holds {actual} bytes, conversion produces {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Policy for reducing a 16-bit sample to a display byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleReduction {
    /// Keep byte offset 0 of each sample.
    #[default]
    LowByte,
    /// Keep byte offset 1 of each sample.
    HighByte,
    /// Map `0..=max` linearly onto `0..=255`, saturating above `max`.
    Scaled { max: u16 },
}

impl SampleReduction {
    /// Reduces the sample stored as `[low, high]`.
    #[inline]
    pub fn reduce(self, low: u8, high: u8) -> u8 {
        match self {
            SampleReduction::LowByte => low,
            SampleReduction::HighByte => high,
            SampleReduction::Scaled { max: 0 } => 0,
            SampleReduction::Scaled { max } => {
                let sample = u32::from(u16::from_le_bytes([low, high]).min(max));
                let max = u32::from(max);
                ((sample * 255 + max / 2) / max) as u8
            }
        }
    }
}

/// Converts single-channel infrared samples to RGBA.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelConverter {
    reduction: SampleReduction,
}

impl PixelConverter {
    pub fn new(reduction: SampleReduction) -> Self {
        Self { reduction }
    }

    pub fn reduction(&self) -> SampleReduction {
        self.reduction
    }

    /// Converts `pixel_count` packed samples into a new RGBA byte buffer.
    ///
    /// The result is exactly `4 * pixel_count` bytes long. The source is
    /// checked before anything is allocated.
    pub fn convert(&self, source: &[u8], pixel_count: usize) -> Result<Vec<u8>, ConvertError> {
        let needed = source_len(pixel_count, source.len())?;
        check_source(source.len(), needed)?;
        let mut out = vec![0u8; pixel_count * BYTES_PER_PIXEL];
        self.write_pixels(&source[..needed], &mut out);
        Ok(out)
    }

    /// Converts `pixel_count` packed samples into `out`.
    ///
    /// `out` must be exactly `4 * pixel_count` bytes.
    pub fn convert_into(
        &self,
        source: &[u8],
        pixel_count: usize,
        out: &mut [u8],
    ) -> Result<(), ConvertError> {
        let needed = source_len(pixel_count, source.len())?;
        check_source(source.len(), needed)?;
        // Cannot overflow: `needed` fits in a slice length.
        check_destination(out.len(), pixel_count * BYTES_PER_PIXEL)?;
        self.write_pixels(&source[..needed], out);
        Ok(())
    }

    /// Converts a locked frame into `out`, honouring the frame's stride.
    pub fn convert_frame(
        &self,
        frame: &BufferLock<'_>,
        out: &mut ColorBuffer,
    ) -> Result<(), ConvertError> {
        let available = frame.as_bytes().len();
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let pixel_count = width
            .checked_mul(height)
            .ok_or_else(|| overflow(available))?;

        if frame.is_packed() {
            return self.convert_into(frame.as_bytes(), pixel_count, out.as_bytes_mut());
        }

        let row_bytes = source_len(width, available)?;
        if frame.stride() < row_bytes {
            return Err(ConvertError::BufferUnderrun {
                needed: row_bytes,
                available: frame.stride(),
            });
        }
        let needed = match height {
            0 => 0,
            h => frame
                .stride()
                .checked_mul(h - 1)
                .and_then(|n| n.checked_add(row_bytes))
                .ok_or_else(|| overflow(available))?,
        };
        check_source(available, needed)?;
        check_destination(out.len(), pixel_count * BYTES_PER_PIXEL)?;

        let source = frame.as_bytes();
        let out_row_bytes = width * BYTES_PER_PIXEL;
        for (y, dst) in out
            .as_bytes_mut()
            .chunks_exact_mut(out_row_bytes.max(1))
            .take(height)
            .enumerate()
        {
            let start = y * frame.stride();
            self.write_pixels(&source[start..start + row_bytes], dst);
        }
        Ok(())
    }

    // Lengths are validated by the callers.
    fn write_pixels(&self, source: &[u8], out: &mut [u8]) {
        let reduction = self.reduction;
        for (sample, pixel) in source
            .chunks_exact(BYTES_PER_SAMPLE)
            .zip(out.chunks_exact_mut(BYTES_PER_PIXEL))
        {
            let v = reduction.reduce(sample[0], sample[1]);
            pixel.copy_from_slice(&[v, v, v, 0xFF]);
        }
    }
}

/// Converts packed samples with the default low-byte policy.
pub fn convert(source: &[u8], pixel_count: usize) -> Result<Vec<u8>, ConvertError> {
    PixelConverter::default().convert(source, pixel_count)
}

/// Bytes needed for `pixel_count` samples.
fn source_len(pixel_count: usize, available: usize) -> Result<usize, ConvertError> {
    pixel_count
        .checked_mul(BYTES_PER_SAMPLE)
        .ok_or_else(|| overflow(available))
}

// A requirement past `usize::MAX` can never be met by a real buffer.
fn overflow(available: usize) -> ConvertError {
    ConvertError::BufferUnderrun {
        needed: usize::MAX,
        available,
    }
}

fn check_source(available: usize, needed: usize) -> Result<(), ConvertError> {
    if available < needed {
        return Err(ConvertError::BufferUnderrun { needed, available });
    }
    Ok(())
}

fn check_destination(actual: usize, expected: usize) -> Result<(), ConvertError> {
    if actual != expected {
        return Err(ConvertError::SizeMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::RawFrame;
    use proptest::prelude::*;

    #[test]
    fn test_low_byte_replication() {
        let out = convert(&[10, 0xAA, 20, 0xBB, 30, 0xCC, 40, 0xDD], 4).unwrap();
        assert_eq!(
            out,
            vec![10, 10, 10, 255, 20, 20, 20, 255, 30, 30, 30, 255, 40, 40, 40, 255]
        );
    }

    #[test]
    fn test_zero_pixels() {
        assert!(convert(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_underrun_reports_lengths() {
        assert_eq!(
            convert(&[1, 2, 3], 2),
            Err(ConvertError::BufferUnderrun {
                needed: 4,
                available: 3
            })
        );
    }

    #[test]
    fn test_huge_pixel_count_underruns_without_allocating() {
        assert_eq!(
            convert(&[1, 2, 3], usize::MAX / 2),
            Err(ConvertError::BufferUnderrun {
                needed: usize::MAX - 1,
                available: 3
            })
        );
    }

    #[test]
    fn test_overflowing_pixel_count_underruns() {
        let converter = PixelConverter::default();
        let mut out = vec![0u8; 4];
        assert_eq!(
            converter.convert_into(&[1, 0], usize::MAX, &mut out),
            Err(ConvertError::BufferUnderrun {
                needed: usize::MAX,
                available: 2
            })
        );
        assert_eq!(out, vec![0u8; 4]);
    }

    #[test]
    fn test_convert_frame_overflowing_stride_underruns() {
        let frame = RawFrame::with_stride(vec![0u8; 8], 1, 3, usize::MAX / 2, 1);
        let mut out = ColorBuffer::new(1, 3);

        let result = PixelConverter::default().convert_frame(&frame.lock_buffer(), &mut out);

        assert_eq!(
            result,
            Err(ConvertError::BufferUnderrun {
                needed: usize::MAX,
                available: 8
            })
        );
    }

    #[test]
    fn test_underrun_leaves_destination_untouched() {
        let converter = PixelConverter::default();
        let mut out = vec![7u8; 8];
        assert!(converter.convert_into(&[1, 0], 2, &mut out).is_err());
        assert_eq!(out, vec![7u8; 8]);
    }

    #[test]
    fn test_destination_size_mismatch() {
        let converter = PixelConverter::default();
        let mut out = vec![0u8; 5];
        assert_eq!(
            converter.convert_into(&[1, 0, 2, 0], 2, &mut out),
            Err(ConvertError::SizeMismatch {
                expected: 8,
                actual: 5
            })
        );
    }

    #[test]
    fn test_high_byte_and_scaled_policies() {
        assert_eq!(SampleReduction::HighByte.reduce(0x34, 0x12), 0x12);

        let scaled = SampleReduction::Scaled { max: 1000 };
        assert_eq!(scaled.reduce(0, 0), 0);
        // 1000 little-endian = [0xE8, 0x03]
        assert_eq!(scaled.reduce(0xE8, 0x03), 255);
        // Above max saturates.
        assert_eq!(scaled.reduce(0xFF, 0xFF), 255);
        // 500 / 1000 rounds to 128.
        assert_eq!(scaled.reduce(0xF4, 0x01), 128);
    }

    #[test]
    fn test_convert_frame_skips_row_padding() {
        // 2x2 frame, stride 6: two samples then two padding bytes per row.
        let data = vec![1, 0, 2, 0, 99, 99, 3, 0, 4, 0];
        let frame = RawFrame::with_stride(data, 2, 2, 6, 1);
        let mut out = ColorBuffer::new(2, 2);

        PixelConverter::default()
            .convert_frame(&frame.lock_buffer(), &mut out)
            .unwrap();

        assert_eq!(out.pixel(0, 0), Some([1, 1, 1, 255]));
        assert_eq!(out.pixel(1, 0), Some([2, 2, 2, 255]));
        assert_eq!(out.pixel(0, 1), Some([3, 3, 3, 255]));
        assert_eq!(out.pixel(1, 1), Some([4, 4, 4, 255]));
    }

    #[test]
    fn test_convert_frame_truncated_padded_frame() {
        let frame = RawFrame::with_stride(vec![0u8; 8], 2, 2, 6, 1);
        let mut out = ColorBuffer::new(2, 2);
        out.fill([9, 9, 9, 9]);

        let result = PixelConverter::default().convert_frame(&frame.lock_buffer(), &mut out);

        assert_eq!(
            result,
            Err(ConvertError::BufferUnderrun {
                needed: 10,
                available: 8
            })
        );
        assert_eq!(out.pixel(1, 1), Some([9, 9, 9, 9]));
    }

    proptest! {
        #[test]
        fn prop_convert_replicates_low_byte(
            source in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let n = source.len() / 2;
            let out = convert(&source, n).unwrap();

            prop_assert_eq!(out.len(), 4 * n);
            for i in 0..n {
                prop_assert_eq!(out[4 * i], source[2 * i]);
                prop_assert_eq!(out[4 * i + 1], source[2 * i]);
                prop_assert_eq!(out[4 * i + 2], source[2 * i]);
                prop_assert_eq!(out[4 * i + 3], 0xFF);
            }
        }

        #[test]
        fn prop_short_source_underruns(
            n in 1usize..256,
            short_by in 1usize..8,
        ) {
            let len = (2 * n).saturating_sub(short_by);
            let source = vec![0u8; len];
            prop_assert_eq!(
                convert(&source, n),
                Err(ConvertError::BufferUnderrun { needed: 2 * n, available: len })
            );
        }
    }
}
