//! Per-series descriptors.

use serde::Serialize;

use crate::error::FormatError;
use crate::format::tiff::{Ifd, PhotometricInterpretation};

use super::layout::PyramidLayout;

// =============================================================================
// PixelType
// =============================================================================

/// Storage type of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float,
    Double,
}

impl PixelType {
    /// Resolve from BitsPerSample and SampleFormat (1 unsigned, 2 signed,
    /// 3 IEEE float).
    pub fn from_tiff(bits_per_sample: u16, sample_format: u16) -> Result<Self, FormatError> {
        let pixel_type = match (sample_format, bits_per_sample) {
            (1, 8) => PixelType::Uint8,
            (1, 16) => PixelType::Uint16,
            (1, 32) => PixelType::Uint32,
            (2, 8) => PixelType::Int8,
            (2, 16) => PixelType::Int16,
            (2, 32) => PixelType::Int32,
            (3, 32) => PixelType::Float,
            (3, 64) => PixelType::Double,
            _ => {
                return Err(FormatError::UnsupportedPixelType {
                    bits_per_sample,
                    sample_format,
                })
            }
        };
        Ok(pixel_type)
    }

    /// Bytes per sample.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            PixelType::Int8 | PixelType::Uint8 => 1,
            PixelType::Int16 | PixelType::Uint16 => 2,
            PixelType::Int32 | PixelType::Uint32 | PixelType::Float => 4,
            PixelType::Double => 8,
        }
    }
}

// =============================================================================
// SeriesDescriptor
// =============================================================================

/// Shape and pixel format of one logical series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesDescriptor {
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: usize,
    pub size_c: usize,
    pub size_t: usize,
    pub image_count: usize,
    pub pixel_type: PixelType,
    pub is_rgb: bool,
    pub is_indexed: bool,
    pub little_endian: bool,
    pub dimension_order: &'static str,
    /// Either side exceeds the direct-decode threshold.
    pub interleaved: bool,
    pub is_thumbnail: bool,
    pub optimal_tile_width: u32,
    pub optimal_tile_height: u32,
    /// Storage index of plane 0.
    pub stored_index: usize,
}

impl SeriesDescriptor {
    /// Build the descriptor of `series` from its representative IFD.
    pub fn build(
        series: usize,
        ifd: &Ifd,
        layout: &PyramidLayout,
        direct_decode_threshold: u32,
        tile_working_set_bytes: usize,
    ) -> Result<Self, FormatError> {
        let size_x = ifd.image_width()?;
        let size_y = ifd.image_height()?;
        let samples = ifd.samples_per_pixel() as usize;
        let photometric = ifd.photometric();
        let pixel_type = PixelType::from_tiff(ifd.bits_per_sample(), ifd.sample_format())?;

        let is_rgb = samples > 1 || photometric == Some(PhotometricInterpretation::Rgb);
        let size_c = if is_rgb { samples } else { 1 };
        let is_indexed =
            photometric == Some(PhotometricInterpretation::Palette) && ifd.has_color_map();

        let size_z = layout.size_z(series);
        let size_t = 1;

        let row_bytes = (size_x as usize)
            .saturating_mul(size_c)
            .saturating_mul(pixel_type.bytes_per_sample())
            .max(1);
        let optimal_tile_height = (tile_working_set_bytes / row_bytes)
            .min(size_y as usize)
            .max(1) as u32;

        Ok(Self {
            size_x,
            size_y,
            size_z,
            size_c,
            size_t,
            image_count: size_z * size_t,
            pixel_type,
            is_rgb,
            is_indexed,
            little_endian: ifd.is_little_endian(),
            dimension_order: "XYCZT",
            interleaved: size_x > direct_decode_threshold || size_y > direct_decode_threshold,
            is_thumbnail: series != 0,
            optimal_tile_width: size_x,
            optimal_tile_height,
            stored_index: layout.stored_index(series, 0),
        })
    }

    /// Bytes of one pixel across all channels.
    #[inline]
    pub fn pixel_bytes(&self) -> usize {
        self.size_c * self.pixel_type.bytes_per_sample()
    }

    /// Bytes needed for a `w` x `h` region.
    #[inline]
    pub fn region_bytes(&self, w: u32, h: u32) -> usize {
        w as usize * h as usize * self.pixel_bytes()
    }
}
