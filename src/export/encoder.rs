//! Image encoder collaborator and the PNG implementation.

use std::borrow::Cow;
use std::io::Write;

use thiserror::Error;

use crate::pipeline::BYTES_PER_PIXEL;

/// Resolution written into saved images.
pub const DEFAULT_DPI: f64 = 96.0;

const METERS_PER_INCH: f64 = 0.0254;

/// Layout of the pixel bytes handed to an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, R G B A.
    Rgba8,
}

/// How the alpha channel is treated on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    /// Alpha is written as fully opaque regardless of the input.
    Ignore,
    /// Alpha is written as given.
    Straight,
}

/// Fixed encode parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeParams {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub alpha: AlphaMode,
    pub dpi_x: f64,
    pub dpi_y: f64,
}

impl EncodeParams {
    /// RGBA8, alpha ignored, 96 DPI on both axes.
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::Rgba8,
            alpha: AlphaMode::Ignore,
            dpi_x: DEFAULT_DPI,
            dpi_y: DEFAULT_DPI,
        }
    }

    fn expected_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * BYTES_PER_PIXEL
    }
}

/// Errors that can occur while encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("pixel data holds {actual} bytes, {width}x{height} needs {expected}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("png encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("failed to flush encoded image: {0}")]
    Io(#[from] std::io::Error),
}

/// Encodes raw pixels into a file format.
pub trait ImageEncoder {
    /// File extension (without dot) for the produced format.
    fn extension(&self) -> &'static str;

    /// Encodes `pixels` into `out` and flushes it.
    fn encode(
        &self,
        pixels: &[u8],
        params: &EncodeParams,
        out: &mut dyn Write,
    ) -> Result<(), EncodeError>;
}

/// PNG encoder writing an `pHYs` resolution chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngImageEncoder;

impl PngImageEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ImageEncoder for PngImageEncoder {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn encode(
        &self,
        pixels: &[u8],
        params: &EncodeParams,
        out: &mut dyn Write,
    ) -> Result<(), EncodeError> {
        let expected = params.expected_len();
        if pixels.len() != expected {
            return Err(EncodeError::SizeMismatch {
                width: params.width,
                height: params.height,
                expected,
                actual: pixels.len(),
            });
        }

        let data = match params.alpha {
            AlphaMode::Ignore => opaque(pixels),
            AlphaMode::Straight => Cow::Borrowed(pixels),
        };

        let mut encoder = png::Encoder::new(&mut *out, params.width, params.height);
        match params.format {
            PixelFormat::Rgba8 => {
                encoder.set_color(png::ColorType::Rgba);
                encoder.set_depth(png::BitDepth::Eight);
            }
        }
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: dots_per_meter(params.dpi_x),
            yppu: dots_per_meter(params.dpi_y),
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
        writer.finish()?;
        out.flush()?;
        Ok(())
    }
}

/// Forces every alpha byte to 0xFF, copying only when needed.
fn opaque(pixels: &[u8]) -> Cow<'_, [u8]> {
    if pixels
        .chunks_exact(BYTES_PER_PIXEL)
        .all(|p| p[3] == 0xFF)
    {
        return Cow::Borrowed(pixels);
    }
    let mut owned = pixels.to_vec();
    for pixel in owned.chunks_exact_mut(BYTES_PER_PIXEL) {
        pixel[3] = 0xFF;
    }
    Cow::Owned(owned)
}

fn dots_per_meter(dpi: f64) -> u32 {
    (dpi / METERS_PER_INCH).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (png::OutputInfo, Option<png::PixelDimensions>, Vec<u8>) {
        let decoder = png::Decoder::new(bytes);
        let mut reader = decoder.read_info().unwrap();
        let dims = reader.info().pixel_dims;
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info, dims, buf)
    }

    #[test]
    fn test_png_roundtrip_metadata() {
        let pixels = vec![10, 10, 10, 255, 20, 20, 20, 255];
        let mut out = Vec::new();
        PngImageEncoder
            .encode(&pixels, &EncodeParams::rgba8(2, 1), &mut out)
            .unwrap();

        let (info, dims, data) = decode(&out);
        assert_eq!((info.width, info.height), (2, 1));
        assert_eq!(info.color_type, png::ColorType::Rgba);
        assert_eq!(info.bit_depth, png::BitDepth::Eight);
        assert_eq!(data, pixels);

        let dims = dims.unwrap();
        assert_eq!(dims.xppu, 3780);
        assert_eq!(dims.yppu, 3780);
        assert_eq!(dims.unit, png::Unit::Meter);
    }

    #[test]
    fn test_alpha_ignored_on_encode() {
        let pixels = vec![1, 2, 3, 0, 4, 5, 6, 128];
        let mut out = Vec::new();
        PngImageEncoder
            .encode(&pixels, &EncodeParams::rgba8(2, 1), &mut out)
            .unwrap();

        let (_, _, data) = decode(&out);
        assert_eq!(data, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_straight_alpha_kept_on_encode() {
        let pixels = vec![1, 2, 3, 0, 4, 5, 6, 128];
        let params = EncodeParams {
            alpha: AlphaMode::Straight,
            ..EncodeParams::rgba8(2, 1)
        };
        let mut out = Vec::new();
        PngImageEncoder.encode(&pixels, &params, &mut out).unwrap();

        let (_, _, data) = decode(&out);
        assert_eq!(data, pixels);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut out = Vec::new();
        let result = PngImageEncoder.encode(&[0u8; 7], &EncodeParams::rgba8(2, 1), &mut out);
        assert!(matches!(
            result,
            Err(EncodeError::SizeMismatch {
                expected: 8,
                actual: 7,
                ..
            })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_dots_per_meter() {
        assert_eq!(dots_per_meter(96.0), 3780);
        assert_eq!(dots_per_meter(72.0), 2835);
    }
}
