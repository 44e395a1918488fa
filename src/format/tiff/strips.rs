//! Whole-strip decoding for the direct read path.
//!
//! Small sub-images are served by decoding every strip that intersects the
//! requested rows and copying the requested columns out. Uncompressed and
//! JPEG strips are supported; JPEG strips may be abbreviated streams that
//! rely on the IFD's `JPEGTables`.

use bytes::Bytes;
use tracing::trace;

use crate::error::{DecodeError, ReaderError, TiffError};
use crate::format::jpeg::{decode_jpeg, prepare_strip_jpeg};
use crate::io::RangeReader;

use super::directory::Ifd;
use super::tags::Compression;

// =============================================================================
// StripLayout
// =============================================================================

/// Strip table of one stored sub-image.
#[derive(Debug, Clone)]
pub struct StripLayout {
    pub width: u32,
    pub height: u32,
    pub rows_per_strip: u32,
    pub compression: Compression,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub jpeg_tables: Option<Bytes>,
}

impl StripLayout {
    /// Collect the strip table of `ifd`.
    pub fn from_ifd(ifd: &Ifd) -> Result<Self, TiffError> {
        let width = ifd.image_width()?;
        let height = ifd.image_height()?;

        let compression = Compression::from_u16(ifd.compression());

        if ifd.planar_configuration() != 1 && ifd.samples_per_pixel() > 1 {
            return Err(TiffError::InvalidTagValue {
                tag: "PlanarConfiguration",
                message: "only chunky (interleaved) samples are supported".to_string(),
            });
        }

        let offsets = ifd.strip_offsets()?;
        let byte_counts = ifd.strip_byte_counts()?;
        if offsets.is_empty() || offsets.len() != byte_counts.len() {
            return Err(TiffError::InvalidTagValue {
                tag: "StripByteCounts",
                message: format!(
                    "{} strip offsets but {} byte counts",
                    offsets.len(),
                    byte_counts.len()
                ),
            });
        }

        let rows_per_strip = ifd.rows_per_strip().unwrap_or(height).min(height.max(1));

        Ok(Self {
            width,
            height,
            rows_per_strip,
            compression,
            offsets,
            byte_counts,
            jpeg_tables: ifd.jpeg_tables(),
        })
    }

    /// Offset and byte count of the first strip.
    pub fn first_strip(&self) -> (u64, u64) {
        (self.offsets[0], self.byte_counts[0])
    }

    /// Number of rows held by strip `index`.
    fn rows_in_strip(&self, index: usize) -> u32 {
        let start = index as u64 * self.rows_per_strip as u64;
        (self.height as u64)
            .saturating_sub(start)
            .min(self.rows_per_strip as u64) as u32
    }
}

// =============================================================================
// Direct decode
// =============================================================================

/// Decode the rectangle `(x, y, w, h)` of a sub-image into `buf`.
///
/// `pixel_bytes` is the size of one pixel (channels times bytes per
/// sample); `buf` is filled row by row at stride `w * pixel_bytes`. The
/// rectangle must already be validated against the image bounds.
#[allow(clippy::too_many_arguments)]
pub fn read_strip_region<R: RangeReader + ?Sized>(
    reader: &R,
    layout: &StripLayout,
    pixel_bytes: usize,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    buf: &mut [u8],
) -> Result<(), ReaderError> {
    if !layout.compression.is_supported() {
        return Err(TiffError::UnsupportedCompression(layout.compression.to_string()).into());
    }
    if layout.rows_per_strip == 0 {
        return Err(DecodeError::InvalidLayout("zero rows per strip".to_string()).into());
    }

    let row_bytes = layout.width as usize * pixel_bytes;
    let out_stride = w as usize * pixel_bytes;
    let col_start = x as usize * pixel_bytes;

    let first = (y / layout.rows_per_strip) as usize;
    let last = ((y + h - 1) / layout.rows_per_strip) as usize;

    for strip in first..=last {
        let (offset, count) = match (layout.offsets.get(strip), layout.byte_counts.get(strip)) {
            (Some(&o), Some(&c)) => (o, c),
            _ => {
                return Err(DecodeError::InvalidLayout(format!(
                    "strip {} missing from a table of {}",
                    strip,
                    layout.offsets.len()
                ))
                .into())
            }
        };

        let strip_rows = layout.rows_in_strip(strip);
        let strip_start = strip as u32 * layout.rows_per_strip;
        let data = reader.read_exact_at(offset, count as usize)?;

        trace!(strip, offset, count, strip_rows, "Decoding strip");

        let pixels = match layout.compression {
            Compression::Jpeg => {
                let stream = prepare_strip_jpeg(layout.jpeg_tables.as_deref(), &data);
                let decoded = decode_jpeg(&stream, layout.width)?;
                if decoded.row_bytes() < row_bytes || decoded.height < strip_rows {
                    return Err(DecodeError::Truncated {
                        expected: strip_rows as usize * row_bytes,
                        actual: decoded.height as usize * decoded.row_bytes(),
                    }
                    .into());
                }
                // Re-pack rows to the sub-image width
                let stride = decoded.row_bytes();
                let mut packed = Vec::with_capacity(strip_rows as usize * row_bytes);
                for r in 0..strip_rows as usize {
                    packed.extend_from_slice(&decoded.pixels[r * stride..r * stride + row_bytes]);
                }
                Bytes::from(packed)
            }
            _ => {
                let expected = strip_rows as usize * row_bytes;
                if data.len() < expected {
                    return Err(DecodeError::Truncated {
                        expected,
                        actual: data.len(),
                    }
                    .into());
                }
                data
            }
        };

        let from = y.max(strip_start);
        let to = (y + h).min(strip_start + strip_rows);
        for row in from..to {
            let src = (row - strip_start) as usize * row_bytes + col_start;
            let dst = (row - y) as usize * out_stride;
            buf[dst..dst + out_stride].copy_from_slice(&pixels[src..src + out_stride]);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
