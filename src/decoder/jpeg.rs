//! JPEG scanline decoder.
//!
//! The codec decodes the strip in full, after which only the requested row
//! window is retained. Memory held between requests is bounded by the
//! window; the transient decode buffer is one strip, checked against the
//! image width before it is allocated.

use tracing::debug;

use crate::error::{DecodeError, DependencyError};
use crate::format::jpeg::{decode_jpeg, prepare_strip_jpeg, DecodedJpeg};
use crate::io::ByteRange;

use super::{clip_window, ScanlineDecoder, ScanlineDecoderFactory};

/// Rows retained from the last decode.
#[derive(Debug)]
struct Window {
    width: u32,
    height: u32,
    first_row: u32,
    row_count: u32,
    row_bytes: usize,
    pixels: Vec<u8>,
}

/// Scanline decoder for JPEG-compressed strips.
#[derive(Debug, Default)]
pub struct JpegScanlineDecoder {
    window: Option<Window>,
}

impl JpegScanlineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode(range: &ByteRange, image_width: u32) -> Result<DecodedJpeg, DecodeError> {
        let data = range.read_all()?;
        let stream = prepare_strip_jpeg(range.jpeg_tables(), &data);
        let decoded = decode_jpeg(&stream, image_width)?;
        if decoded.width != image_width {
            return Err(DecodeError::InvalidLayout(format!(
                "JPEG stream is {} pixels wide, image is {}",
                decoded.width, image_width
            )));
        }
        Ok(decoded)
    }

    fn keep_rows(decoded: DecodedJpeg, start_row: u32, row_count: u32) -> Window {
        let (first_row, row_count) = clip_window(start_row, row_count, decoded.height);
        let row_bytes = decoded.row_bytes();
        let start = first_row as usize * row_bytes;
        let end = start + row_count as usize * row_bytes;

        let pixels = if start == 0 && end == decoded.pixels.len() {
            decoded.pixels
        } else {
            decoded.pixels[start..end].to_vec()
        };

        Window {
            width: decoded.width,
            height: decoded.height,
            first_row,
            row_count,
            row_bytes,
            pixels,
        }
    }
}

impl ScanlineDecoder for JpegScanlineDecoder {
    fn initialize(&mut self, range: ByteRange, image_width: u32) -> Result<(), DecodeError> {
        self.initialize_rows(range, 0, u32::MAX, image_width)
    }

    fn initialize_rows(
        &mut self,
        range: ByteRange,
        start_row: u32,
        row_count: u32,
        image_width: u32,
    ) -> Result<(), DecodeError> {
        self.close();

        let decoded = Self::decode(&range, image_width)?;
        let window = Self::keep_rows(decoded, start_row, row_count);
        debug!(
            resource = range.identifier(),
            offset = range.offset(),
            first_row = window.first_row,
            row_count = window.row_count,
            "Initialized JPEG scanline window"
        );
        self.window = Some(window);
        Ok(())
    }

    fn scanline(&self, row: u32) -> Option<&[u8]> {
        let window = self.window.as_ref()?;
        let index = row.checked_sub(window.first_row)?;
        if index >= window.row_count {
            return None;
        }
        let start = index as usize * window.row_bytes;
        window.pixels.get(start..start + window.row_bytes)
    }

    fn width(&self) -> u32 {
        self.window.as_ref().map_or(0, |w| w.width)
    }

    fn height(&self) -> u32 {
        self.window.as_ref().map_or(0, |w| w.height)
    }

    fn close(&mut self) {
        self.window = None;
    }
}

/// Factory for [`JpegScanlineDecoder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegDecoderFactory;

impl ScanlineDecoderFactory for JpegDecoderFactory {
    type Decoder = JpegScanlineDecoder;

    fn instantiate(&self) -> Result<Self::Decoder, DependencyError> {
        Ok(JpegScanlineDecoder::new())
    }
}
