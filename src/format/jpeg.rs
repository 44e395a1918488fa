//! JPEG strip handling.
//!
//! NDPI strips are usually complete baseline JPEG streams. Some writers
//! instead store abbreviated streams whose quantization and Huffman tables
//! live once in the IFD's `JPEGTables` tag; those are merged before
//! decoding:
//!
//! ```text
//! tables: SOI DQT DHT EOI      strip: SOI SOF SOS ... EOI
//! merged: SOI DQT DHT SOF SOS ... EOI
//! ```

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};

use crate::error::DecodeError;

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
const SOS: [u8; 2] = [0xFF, 0xDA];

// =============================================================================
// Stream Analysis
// =============================================================================

/// Whether `data` is an abbreviated stream: SOI, then a scan without any
/// DQT or DHT segment before it.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Standalone markers carry no length field
        let standalone = matches!(marker[1], 0x00 | 0x01 | 0xD0..=0xD9 | 0xFF);
        if !standalone && pos + 3 < data.len() {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Whether `data` starts with SOI and carries its own quantization tables.
pub fn is_complete_stream(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..2] == SOI && data[2..].windows(2).any(|w| w == DQT)
}

// =============================================================================
// Table Merging
// =============================================================================

/// Splice `tables` in front of an abbreviated strip.
///
/// The trailing EOI of the tables and the leading SOI of the strip are
/// dropped so the result is one well-formed stream.
pub fn merge_jpeg_tables(tables: &[u8], strip: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(strip);
    }
    if strip.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI[..]).unwrap_or(tables);
    let strip = strip.strip_prefix(&SOI[..]).unwrap_or(strip);

    let mut merged = BytesMut::with_capacity(tables.len() + strip.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(strip);
    merged.freeze()
}

/// Return a decodable stream for a strip, merging `tables` when the strip
/// is abbreviated.
pub fn prepare_strip_jpeg(tables: Option<&[u8]>, strip: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !is_complete_stream(strip) && is_abbreviated_stream(strip) => {
            merge_jpeg_tables(tables, strip)
        }
        _ => Bytes::copy_from_slice(strip),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// A fully decoded JPEG stream, rows packed with no padding.
#[derive(Debug, Clone)]
pub struct DecodedJpeg {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub pixels: Vec<u8>,
}

impl DecodedJpeg {
    /// Bytes in one row.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.channels
    }

    /// Row `row`, if it exists.
    pub fn row(&self, row: u32) -> Option<&[u8]> {
        if row >= self.height {
            return None;
        }
        let stride = self.row_bytes();
        let start = row as usize * stride;
        self.pixels.get(start..start + stride)
    }
}

/// Decode a complete JPEG stream to 8-bit samples.
///
/// The frame header is checked against `max_width` before the pixel buffer
/// is allocated. The codec's default allocation cap is lifted: a full-height
/// NDPI strip routinely exceeds it.
pub fn decode_jpeg(data: &[u8], max_width: u32) -> Result<DecodedJpeg, DecodeError> {
    let mut reader = ImageReader::with_format(Cursor::new(data), ImageFormat::Jpeg);
    reader.no_limits();
    let decoder = reader.into_decoder().map_err(jpeg_error)?;

    let (width, height) = decoder.dimensions();
    if width > max_width {
        return Err(DecodeError::InvalidLayout(format!(
            "JPEG stream is {} pixels wide, image is {}",
            width, max_width
        )));
    }

    let img = DynamicImage::from_decoder(decoder).map_err(jpeg_error)?;
    let channels = img.color().channel_count() as usize;

    Ok(DecodedJpeg {
        width,
        height,
        channels,
        pixels: img.into_bytes(),
    })
}

fn jpeg_error(e: image::ImageError) -> DecodeError {
    DecodeError::Jpeg {
        message: e.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
