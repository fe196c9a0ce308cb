//! RGBA raster buffers.
//!
//! The codec works on a plain RGBA8 pixel buffer. Decoding from and encoding to
//! a file container (PNG) lives here so the codec never sees file formats.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::error::{CertError, Result};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// A decoded image: width, height and an RGBA byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// `width * height * 4`, or `None` if that does not fit in `usize`.
fn buffer_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(CHANNELS))
}

impl RasterImage {
    /// Wraps an RGBA buffer, checking `data.len() == width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = buffer_len(width, height);

        match expected {
            Some(expected) if expected == data.len() => Ok(Self {
                width,
                height,
                data,
            }),
            _ => Err(CertError::InvalidRaster {
                width,
                height,
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            }),
        }
    }

    /// Creates an image with every pixel set to `rgba`.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let len = buffer_len(width, height).ok_or(CertError::InvalidRaster {
            width,
            height,
            expected: usize::MAX,
            actual: 0,
        })?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, data)
    }

    /// Decodes an encoded image file (PNG) into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Self::new(width, height, decoded.into_raw())
    }

    /// Encodes the buffer losslessly as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let buffer = RgbaImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            CertError::InvalidRaster {
                width: self.width,
                height: self.height,
                expected: buffer_len(self.width, self.height).unwrap_or(usize::MAX),
                actual: self.data.len(),
            },
        )?;

        let mut out = Cursor::new(Vec::new());
        buffer.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
