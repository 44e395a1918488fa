//! Scanline decoder for uncompressed strips.
//!
//! Only the bytes of the requested rows are read from the strip.

use tracing::debug;

use crate::error::{DecodeError, DependencyError};
use crate::io::ByteRange;

use super::{clip_window, ScanlineDecoder, ScanlineDecoderFactory};

#[derive(Debug)]
struct Window {
    width: u32,
    height: u32,
    first_row: u32,
    row_count: u32,
    row_bytes: usize,
    pixels: Vec<u8>,
}

/// Decoder over strips holding packed, uncompressed pixels.
#[derive(Debug)]
pub struct RawScanlineDecoder {
    bytes_per_pixel: usize,
    window: Option<Window>,
}

impl RawScanlineDecoder {
    /// Create an idle decoder for pixels of `bytes_per_pixel` bytes.
    pub fn new(bytes_per_pixel: usize) -> Self {
        Self {
            bytes_per_pixel: bytes_per_pixel.max(1),
            window: None,
        }
    }
}

impl ScanlineDecoder for RawScanlineDecoder {
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

        let row_bytes = image_width as usize * self.bytes_per_pixel;
        if row_bytes == 0 {
            return Err(DecodeError::InvalidLayout("zero-width image".to_string()));
        }

        let height = u32::try_from(range.len() / row_bytes as u64).unwrap_or(u32::MAX);
        let (first_row, row_count) = clip_window(start_row, row_count, height);
        let bytes = range.read_at(
            first_row as u64 * row_bytes as u64,
            row_count as usize * row_bytes,
        )?;

        debug!(
            resource = range.identifier(),
            first_row,
            row_count,
            "Initialized raw scanline window"
        );

        self.window = Some(Window {
            width: image_width,
            height,
            first_row,
            row_count,
            row_bytes,
            pixels: bytes.to_vec(),
        });
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

/// Factory for [`RawScanlineDecoder`].
#[derive(Debug, Clone, Copy)]
pub struct RawDecoderFactory {
    pub bytes_per_pixel: usize,
}

impl RawDecoderFactory {
    pub fn new(bytes_per_pixel: usize) -> Self {
        Self { bytes_per_pixel }
    }
}

impl ScanlineDecoderFactory for RawDecoderFactory {
    type Decoder = RawScanlineDecoder;

    fn instantiate(&self) -> Result<Self::Decoder, DependencyError> {
        Ok(RawScanlineDecoder::new(self.bytes_per_pixel))
    }
}
