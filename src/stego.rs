//! LSB bit codec.
//!
//! Hides a byte payload in the least-significant bit of the R, G and B bytes
//! of an RGBA raster. Alpha bytes are never touched. The payload is wrapped in
//! a self-describing frame:
//!
//! ```text
//! [magic "STEGOv1" (7 bytes)][length u32 LE (4 bytes)][payload (length bytes)]
//! ```
//!
//! Bits are written LSB-first within each frame byte.

use tracing::debug;

use crate::error::{CertError, Result};
use crate::raster::{RasterImage, CHANNELS};

/// Signature identifying an embedded frame.
pub const MAGIC: &[u8; 7] = b"STEGOv1";

/// Size of the little-endian length field.
pub const LENGTH_LEN: usize = 4;

/// Frame bytes that precede the payload.
pub const HEADER_LEN: usize = MAGIC.len() + LENGTH_LEN;

const LSB_MASK: u8 = 0xFE;

/// The byte container written into an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    /// Total frame length in bytes.
    pub fn byte_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    /// Serializes `magic ++ length ++ payload`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len: u32 = self
            .payload
            .len()
            .try_into()
            .map_err(|_| CertError::CapacityExceeded {
                needed_bits: self.byte_len().saturating_mul(8),
                capacity_bits: u32::MAX as usize,
            })?;

        let mut out = Vec::with_capacity(self.byte_len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(self.payload);
        Ok(out)
    }
}

fn is_alpha(index: usize) -> bool {
    (index + 1) % CHANNELS == 0
}

/// Number of bits the image can carry: three per pixel.
pub fn capacity_bits(image: &RasterImage) -> usize {
    (image.data().len() / CHANNELS) * 3
}

/// Largest payload, in bytes, that fits alongside the frame header.
pub fn max_payload_len(image: &RasterImage) -> usize {
    (capacity_bits(image) / 8).saturating_sub(HEADER_LEN)
}

/// Embeds `payload` into the image.
///
/// Fails with `CapacityExceeded` before touching any byte if the framed
/// payload does not fit.
pub fn embed(mut image: RasterImage, payload: &[u8]) -> Result<RasterImage> {
    let frame = Frame::new(payload);
    let needed_bits = frame.byte_len().saturating_mul(8);
    let capacity = capacity_bits(&image);

    if needed_bits > capacity {
        return Err(CertError::CapacityExceeded {
            needed_bits,
            capacity_bits: capacity,
        });
    }

    let framed = frame.to_bytes()?;
    let mut bits = framed
        .iter()
        .flat_map(|&byte| (0..8).map(move |i| (byte >> i) & 1));

    for (index, byte) in image.data_mut().iter_mut().enumerate() {
        if is_alpha(index) {
            continue;
        }
        match bits.next() {
            Some(bit) => *byte = (*byte & LSB_MASK) | bit,
            None => break,
        }
    }

    debug!(
        payload_bytes = payload.len(),
        bits = needed_bits,
        capacity_bits = capacity,
        "Embedded frame"
    );

    Ok(image)
}

/// Reassembles bytes from the carrier LSB stream.
struct LsbReader<I> {
    bits: I,
}

impl<I: Iterator<Item = u8>> LsbReader<I> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = 0u8;
        for i in 0..8 {
            byte |= self.bits.next()? << i;
        }
        Some(byte)
    }

    fn read_bytes(&mut self, count: usize) -> Option<Vec<u8>> {
        (0..count).map(|_| self.read_byte()).collect()
    }
}

/// Extracts the framed payload from the image.
///
/// Total over arbitrary input: a missing or corrupted magic yields
/// `NoHiddenData`, an impossible length yields `MalformedFrame`.
pub fn reveal(image: &RasterImage) -> Result<Vec<u8>> {
    let available = capacity_bits(image) / 8;
    let mut reader = LsbReader {
        bits: image
            .data()
            .iter()
            .enumerate()
            .filter(|(index, _)| !is_alpha(*index))
            .map(|(_, byte)| byte & 1),
    };

    let magic = reader.read_bytes(MAGIC.len()).ok_or(CertError::NoHiddenData)?;
    if magic.as_slice() != MAGIC {
        debug!("Magic marker not found");
        return Err(CertError::NoHiddenData);
    }

    let len_bytes: [u8; LENGTH_LEN] = reader
        .read_bytes(LENGTH_LEN)
        .and_then(|raw| raw.try_into().ok())
        .ok_or(CertError::MalformedFrame)?;
    let len = u32::from_le_bytes(len_bytes) as usize;

    let remaining = available.saturating_sub(HEADER_LEN);
    if len == 0 || len > remaining {
        debug!(declared = len, remaining, "Frame length out of range");
        return Err(CertError::MalformedFrame);
    }

    let payload = reader.read_bytes(len).ok_or(CertError::MalformedFrame)?;
    debug!(payload_bytes = payload.len(), "Revealed frame");
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> RasterImage {
        RasterImage::filled(width, height, [0x80, 0x81, 0x82, 0xFF]).unwrap()
    }

    /// Writes raw frame bytes bit-by-bit the same way `embed` does, without
    /// the capacity or framing logic, to build hostile images.
    fn write_raw(image: &mut RasterImage, raw: &[u8]) {
        let mut bits = raw.iter().flat_map(|&b| (0..8).map(move |i| (b >> i) & 1));
        for (index, byte) in image.data_mut().iter_mut().enumerate() {
            if is_alpha(index) {
                continue;
            }
            match bits.next() {
                Some(bit) => *byte = (*byte & LSB_MASK) | bit,
                None => break,
            }
        }
    }

    #[test]
    fn test_frame_layout() {
        let frame = Frame::new(b"abc").to_bytes().unwrap();
        assert_eq!(&frame[..7], b"STEGOv1");
        assert_eq!(&frame[7..11], &[3, 0, 0, 0]);
        assert_eq!(&frame[11..], b"abc");
    }

    #[test]
    fn test_capacity() {
        assert_eq!(capacity_bits(&gray(10, 10)), 300);
        assert_eq!(max_payload_len(&gray(10, 10)), 37 - HEADER_LEN);
        assert_eq!(max_payload_len(&gray(1, 1)), 0);
    }

    #[test]
    fn test_bits_are_lsb_first_and_skip_alpha() {
        let image = RasterImage::filled(40, 1, [0, 0, 0, 0]).unwrap();
        let out = embed(image, b"Z").unwrap();
        let data = out.data();

        // 'S' = 0x53 = 0b0101_0011, written LSB-first
        let expected = [1, 1, 0, 0, 1, 0, 1, 0];
        let carriers: Vec<u8> = data
            .iter()
            .enumerate()
            .filter(|(i, _)| !is_alpha(*i))
            .map(|(_, b)| *b)
            .take(8)
            .collect();
        assert_eq!(carriers, expected);
        assert!(data.iter().skip(3).step_by(4).all(|&a| a == 0));
    }

    #[test]
    fn test_roundtrip() {
        let payload = "a1b2c3:deadbeef:cafebabe".as_bytes();
        let out = embed(gray(20, 20), payload).unwrap();
        assert_eq!(reveal(&out).unwrap(), payload);
    }

    #[test]
    fn test_bytes_past_frame_untouched() {
        let original = gray(20, 20);
        let out = embed(original.clone(), b"x").unwrap();
        let touched_bytes = (HEADER_LEN + 1) * 8;
        // 96 carrier bits span 32 pixels = 128 raw bytes
        let boundary = touched_bytes / 3 * 4;
        assert_eq!(&out.data()[boundary..], &original.data()[boundary..]);
    }

    #[test]
    fn test_capacity_exceeded_reports_sizes() {
        let image = gray(4, 4);
        let err = embed(image, &[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            CertError::CapacityExceeded {
                needed_bits: 168,
                capacity_bits: 48
            }
        ));
    }

    #[test]
    fn test_clean_image_has_no_hidden_data() {
        assert!(matches!(reveal(&gray(10, 10)), Err(CertError::NoHiddenData)));
    }

    #[test]
    fn test_tiny_image_has_no_hidden_data() {
        assert!(matches!(reveal(&gray(1, 1)), Err(CertError::NoHiddenData)));
        let empty = RasterImage::new(0, 0, Vec::new()).unwrap();
        assert!(matches!(reveal(&empty), Err(CertError::NoHiddenData)));
    }

    #[test]
    fn test_zero_length_is_malformed() {
        let mut image = gray(10, 10);
        write_raw(&mut image, b"STEGOv1\0\0\0\0");
        assert!(matches!(reveal(&image), Err(CertError::MalformedFrame)));
    }

    #[test]
    fn test_oversized_length_is_malformed() {
        let mut image = gray(10, 10);
        let mut raw = MAGIC.to_vec();
        raw.extend_from_slice(&u32::MAX.to_le_bytes());
        write_raw(&mut image, &raw);
        assert!(matches!(reveal(&image), Err(CertError::MalformedFrame)));
    }

    #[test]
    fn test_length_one_past_remaining_is_malformed() {
        let mut image = gray(10, 10);
        let remaining = max_payload_len(&image) as u32;

        let mut raw = MAGIC.to_vec();
        raw.extend_from_slice(&(remaining + 1).to_le_bytes());
        write_raw(&mut image, &raw);
        assert!(matches!(reveal(&image), Err(CertError::MalformedFrame)));

        let mut raw = MAGIC.to_vec();
        raw.extend_from_slice(&remaining.to_le_bytes());
        write_raw(&mut image, &raw);
        assert_eq!(reveal(&image).unwrap().len(), remaining as usize);
    }

    #[test]
    fn test_magic_without_room_for_length() {
        let mut image = gray(19, 1);
        write_raw(&mut image, MAGIC);
        // 19 px = 57 bits = 7 bytes: magic fits, length does not
        assert!(matches!(reveal(&image), Err(CertError::MalformedFrame)));
    }
}
