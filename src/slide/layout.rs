//! Pyramid layout inference.
//!
//! An NDPI container stores its sub-images in a fixed pattern: the base
//! image, its reduced pyramid levels, then for each further focal plane the
//! same run again, followed by auxiliary images (macro, map). Stored order
//! for 3 levels and 2 planes plus a macro image:
//!
//! ```text
//! index:  0      1      2      3      4      5      6
//!         L0/z0  L1/z0  L2/z0  L0/z1  L1/z1  L2/z1  macro
//! ```
//!
//! The layout is inferred from geometry alone: every sub-image the size of
//! the base is another focal plane, and every differently-sized one seen
//! before the second focal plane is a pyramid level.

use tracing::debug;

use crate::error::FormatError;

/// Z-depth and pyramid level count of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLayout {
    z_depth: usize,
    pyramid_levels: usize,
    image_count: usize,
}

impl PyramidLayout {
    /// Infer the layout from stored sub-image dimensions in storage order.
    pub fn resolve(dimensions: &[(u32, u32)]) -> Result<Self, FormatError> {
        let base = *dimensions.first().ok_or(FormatError::EmptyContainer)?;

        let mut z_depth = 1;
        let mut pyramid_levels = 1;
        for &dims in &dimensions[1..] {
            if dims == base {
                z_depth += 1;
            } else if z_depth == 1 {
                pyramid_levels += 1;
            }
        }

        let image_count = dimensions.len();
        if pyramid_levels * z_depth > image_count {
            return Err(FormatError::InconsistentLayout {
                pyramid_levels,
                z_depth,
                image_count,
            });
        }

        debug!(z_depth, pyramid_levels, image_count, "Resolved pyramid layout");

        Ok(Self {
            z_depth,
            pyramid_levels,
            image_count,
        })
    }

    /// Number of focal planes sharing the base dimensions.
    #[inline]
    pub fn z_depth(&self) -> usize {
        self.z_depth
    }

    /// Number of resolution levels, base included.
    #[inline]
    pub fn pyramid_levels(&self) -> usize {
        self.pyramid_levels
    }

    /// Number of stored sub-images.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    /// Pyramid levels plus one flat series per leftover sub-image.
    pub fn series_count(&self) -> usize {
        self.pyramid_levels + (self.image_count - self.pyramid_levels * self.z_depth)
    }

    /// Whether `series` is a pyramid level (as opposed to a flat series).
    #[inline]
    pub fn is_pyramid_level(&self, series: usize) -> bool {
        series < self.pyramid_levels
    }

    /// Focal planes of `series`.
    pub fn size_z(&self, series: usize) -> usize {
        if self.is_pyramid_level(series) {
            self.z_depth
        } else {
            1
        }
    }

    /// Storage index of plane `z` of `series`.
    ///
    /// `series` and `z` must be in range; flat series ignore `z`.
    pub fn stored_index(&self, series: usize, z: usize) -> usize {
        if self.is_pyramid_level(series) {
            z * self.pyramid_levels + series
        } else {
            self.z_depth * self.pyramid_levels + (series - self.pyramid_levels)
        }
    }
}
