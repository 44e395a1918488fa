//! The pyramid reader.
//!
//! [`PyramidReader`] ties the pieces together: the tag directories are read
//! once at open, the pyramid layout and series descriptors are derived from
//! them, and pixel requests are served either by decoding whole strips
//! (small images) or through the staged scanline window (large images).

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::ReaderConfig;
use crate::decoder::ScanlineDecoderFactory;
use crate::error::{FormatError, ReaderError, TiffError};
use crate::format::tiff::{read_strip_region, StripLayout, TiffDirectory, VENDOR_THUMBNAIL_TAGS};
use crate::io::{BlockCache, ByteRange, RangeReader};

use super::layout::PyramidLayout;
use super::metadata::MetadataStore;
use super::series::SeriesDescriptor;
use super::thumbnail::{sample_nearest, thumbnail_size};
use super::window::{Priming, ScanlineWindowCache, WindowState};

// =============================================================================
// PyramidReader
// =============================================================================

/// Reader for pyramidal NDPI slides.
///
/// `R` supplies the bytes; `F` creates the scanline decoder used for images
/// larger than the direct-decode threshold.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use ndpi_reader::{FileRangeReader, JpegDecoderFactory, PyramidReader, ReaderConfig};
///
/// let source = Arc::new(FileRangeReader::open("slide.ndpi")?);
/// let mut reader = PyramidReader::open(source, &JpegDecoderFactory, ReaderConfig::default())?;
///
/// let series = reader.series_descriptor(0).unwrap().clone();
/// let mut buf = vec![0u8; series.region_bytes(512, 512)];
/// reader.read_region(0, 0, 1024, 1024, 512, 512, &mut buf)?;
/// ```
pub struct PyramidReader<R: RangeReader + 'static, F: ScanlineDecoderFactory> {
    source: Arc<R>,
    config: ReaderConfig,
    directory: TiffDirectory,
    layout: PyramidLayout,
    series: Vec<SeriesDescriptor>,
    metadata: MetadataStore,
    window: ScanlineWindowCache<F::Decoder>,
    active_series: usize,
    closed: bool,
}

impl<R: RangeReader + 'static, F: ScanlineDecoderFactory> PyramidReader<R, F> {
    /// Open a slide.
    ///
    /// Reads every tag directory, strips the vendor thumbnail tags, resolves
    /// the pyramid layout and builds all series descriptors. Nothing is
    /// returned unless the whole container is consistent.
    pub fn open(source: Arc<R>, factory: &F, config: ReaderConfig) -> Result<Self, ReaderError> {
        let mut directory = {
            let cache = BlockCache::with_capacity(
                source.clone(),
                config.block_size,
                config.block_cache_capacity,
            );
            TiffDirectory::read(&cache)?
        };
        if directory.is_empty() {
            return Err(FormatError::EmptyContainer.into());
        }

        for tag in VENDOR_THUMBNAIL_TAGS {
            directory.remove_tag(tag.as_u16());
        }

        let dimensions = directory
            .ifds
            .iter()
            .map(|ifd| Ok((ifd.image_width()?, ifd.image_height()?)))
            .collect::<Result<Vec<_>, TiffError>>()?;
        let layout = PyramidLayout::resolve(&dimensions)?;

        let mut series = Vec::with_capacity(layout.series_count());
        for index in 0..layout.series_count() {
            let stored = layout.stored_index(index, 0);
            let ifd = directory
                .get(stored)
                .ok_or(FormatError::InconsistentLayout {
                    pyramid_levels: layout.pyramid_levels(),
                    z_depth: layout.z_depth(),
                    image_count: layout.image_count(),
                })?;
            series.push(SeriesDescriptor::build(
                index,
                ifd,
                &layout,
                config.direct_decode_threshold,
                config.tile_working_set_bytes,
            )?);
        }

        let metadata = MetadataStore::populate(
            &directory.ifds[0],
            series.iter().map(|s| &directory.ifds[s.stored_index]),
        );

        let decoder = factory.instantiate()?;

        info!(
            resource = source.identifier(),
            series_count = series.len(),
            pyramid_levels = layout.pyramid_levels(),
            z_depth = layout.z_depth(),
            width = series[0].size_x,
            height = series[0].size_y,
            "Opened pyramidal slide"
        );

        Ok(Self {
            source,
            config,
            directory,
            layout,
            series,
            metadata,
            window: ScanlineWindowCache::new(decoder),
            active_series: 0,
            closed: false,
        })
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Number of series exposed by the slide.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Descriptor of `series`.
    pub fn series_descriptor(&self, series: usize) -> Option<&SeriesDescriptor> {
        self.series.get(series)
    }

    /// All series descriptors.
    pub fn series_descriptors(&self) -> &[SeriesDescriptor] {
        &self.series
    }

    /// The active series used by [`open_bytes`](Self::open_bytes) and
    /// [`read_thumbnail`](Self::read_thumbnail).
    pub fn series(&self) -> usize {
        self.active_series
    }

    /// Change the active series.
    pub fn set_series(&mut self, series: usize) -> Result<(), ReaderError> {
        self.ensure_open()?;
        if series >= self.series.len() {
            return Err(ReaderError::SeriesOutOfRange {
                series,
                count: self.series.len(),
            });
        }
        self.active_series = series;
        Ok(())
    }

    /// Pyramid levels and focal planes inferred at open.
    pub fn layout(&self) -> &PyramidLayout {
        &self.layout
    }

    /// Per-image and scanner metadata.
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Parsed tag directories, vendor thumbnail tags removed.
    pub fn directory(&self) -> &TiffDirectory {
        &self.directory
    }

    /// Configuration the reader was opened with.
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// What the scanline window currently holds.
    pub fn window_state(&self) -> &WindowState {
        self.window.state()
    }

    /// The scanline decoder session.
    pub fn decoder(&self) -> &F::Decoder {
        self.window.decoder()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // -------------------------------------------------------------------------
    // Pixel Access
    // -------------------------------------------------------------------------

    /// Read plane `plane` of the active series; see
    /// [`read_region`](Self::read_region).
    pub fn open_bytes(
        &mut self,
        plane: usize,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        buf: &mut [u8],
    ) -> Result<(), ReaderError> {
        self.read_region(self.active_series, plane, x, y, w, h, buf)
    }

    /// Copy the `w` x `h` rectangle at (`x`, `y`) of `plane` of `series`
    /// into `buf`, packed at `w * size_c * bytes_per_sample` bytes per row.
    ///
    /// A 1x1 request at the origin returns without touching `buf`. On the
    /// staged path, rows the decoder cannot produce are skipped and keep
    /// whatever `buf` held.
    #[allow(clippy::too_many_arguments)]
    pub fn read_region(
        &mut self,
        series: usize,
        plane: usize,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        buf: &mut [u8],
    ) -> Result<(), ReaderError> {
        let required = self.validate_request(series, plane, x, y, w, h, buf.len())?;

        if x == 0 && y == 0 && w == 1 && h == 1 {
            return Ok(());
        }

        let descriptor = &self.series[series];
        let stored = self.layout.stored_index(series, plane);
        let ifd = self
            .directory
            .get(stored)
            .ok_or(FormatError::InconsistentLayout {
                pyramid_levels: self.layout.pyramid_levels(),
                z_depth: self.layout.z_depth(),
                image_count: self.layout.image_count(),
            })?;
        let pixel_bytes = descriptor.pixel_bytes();
        let threshold = self.config.direct_decode_threshold;

        if descriptor.size_x <= threshold && descriptor.size_y <= threshold {
            trace!(series, plane, stored, x, y, w, h, "Direct strip decode");
            let strips = StripLayout::from_ifd(ifd)?;
            return read_strip_region(
                self.source.as_ref(),
                &strips,
                pixel_bytes,
                x,
                y,
                w,
                h,
                &mut buf[..required],
            );
        }

        if self.window.needs_stage(series, plane, y)? {
            let strips = StripLayout::from_ifd(ifd)?;
            let (offset, byte_count) = strips.first_strip();
            let source: Arc<dyn RangeReader> = self.source.clone();
            let range = ByteRange::open(source, offset, byte_count)?
                .with_jpeg_tables(strips.jpeg_tables.clone());
            let priming = Priming::for_request(descriptor, x, y, w, h);
            self.window
                .stage(range, series, plane, descriptor.size_x, priming)?;
        }

        let copied = self.window.copy_rows(
            y,
            h,
            x as usize * pixel_bytes,
            w as usize * pixel_bytes,
            buf,
        )?;
        if copied < h {
            debug!(series, plane, y, h, copied, "Decoder skipped rows");
        }
        Ok(())
    }

    /// Thumbnail of `plane` of the active series.
    ///
    /// Pyramid series are answered from the smallest pyramid level; the
    /// active series is restored afterwards, also when reading fails.
    pub fn read_thumbnail(&mut self, plane: usize) -> Result<Vec<u8>, ReaderError> {
        self.ensure_open()?;

        if !self.layout.is_pyramid_level(self.active_series) {
            return self.thumbnail_of_active(plane);
        }

        let smallest = self.layout.pyramid_levels() - 1;
        let mut scope = SeriesScope::enter(self, smallest);
        let thumbnail = scope.thumbnail_of_active(plane);
        drop(scope);
        thumbnail
    }

    /// Thumbnail dimensions for `series`.
    pub fn thumbnail_size(&self, series: usize) -> Option<(u32, u32)> {
        self.series
            .get(series)
            .map(|s| thumbnail_size(s.size_x, s.size_y, self.config.thumbnail_dimension))
    }

    fn thumbnail_of_active(&mut self, plane: usize) -> Result<Vec<u8>, ReaderError> {
        let series = self.active_series;
        let descriptor = self.series[series].clone();
        let (thumb_x, thumb_y) = thumbnail_size(
            descriptor.size_x,
            descriptor.size_y,
            self.config.thumbnail_dimension,
        );

        let mut full = vec![0u8; descriptor.region_bytes(descriptor.size_x, descriptor.size_y)];
        self.read_region(
            series,
            plane,
            0,
            0,
            descriptor.size_x,
            descriptor.size_y,
            &mut full,
        )?;

        Ok(sample_nearest(
            &full,
            descriptor.size_x,
            descriptor.size_y,
            thumb_x,
            thumb_y,
            descriptor.pixel_bytes(),
        ))
    }

    /// Release the decoder session. Later reads fail with `Closed`.
    pub fn close(&mut self) {
        if !self.closed {
            debug!(resource = self.source.identifier(), "Closing slide");
        }
        self.window.close();
        self.closed = true;
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), ReaderError> {
        if self.closed {
            Err(ReaderError::Closed)
        } else {
            Ok(())
        }
    }

    /// Check a request and return the number of bytes it fills.
    #[allow(clippy::too_many_arguments)]
    fn validate_request(
        &self,
        series: usize,
        plane: usize,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        buf_len: usize,
    ) -> Result<usize, ReaderError> {
        self.ensure_open()?;

        let descriptor = self
            .series
            .get(series)
            .ok_or(ReaderError::SeriesOutOfRange {
                series,
                count: self.series.len(),
            })?;

        if plane >= descriptor.image_count {
            return Err(ReaderError::PlaneOutOfRange {
                plane,
                count: descriptor.image_count,
            });
        }

        let fits = |start: u32, len: u32, size: u32| {
            len > 0 && start.checked_add(len).is_some_and(|end| end <= size)
        };
        if !fits(x, w, descriptor.size_x) || !fits(y, h, descriptor.size_y) {
            return Err(ReaderError::RegionOutOfBounds {
                x,
                y,
                w,
                h,
                width: descriptor.size_x,
                height: descriptor.size_y,
            });
        }

        let required = descriptor.region_bytes(w, h);
        if buf_len < required {
            return Err(ReaderError::BufferTooSmall {
                required,
                actual: buf_len,
            });
        }

        Ok(required)
    }
}

// =============================================================================
// SeriesScope
// =============================================================================

/// Switches the active series and restores it when dropped.
struct SeriesScope<'a, R: RangeReader + 'static, F: ScanlineDecoderFactory> {
    reader: &'a mut PyramidReader<R, F>,
    saved: usize,
}

impl<'a, R: RangeReader + 'static, F: ScanlineDecoderFactory> SeriesScope<'a, R, F> {
    fn enter(reader: &'a mut PyramidReader<R, F>, series: usize) -> Self {
        let saved = reader.active_series;
        reader.active_series = series;
        Self { reader, saved }
    }
}

impl<R: RangeReader + 'static, F: ScanlineDecoderFactory> Deref for SeriesScope<'_, R, F> {
    type Target = PyramidReader<R, F>;

    fn deref(&self) -> &Self::Target {
        self.reader
    }
}

impl<R: RangeReader + 'static, F: ScanlineDecoderFactory> DerefMut for SeriesScope<'_, R, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reader
    }
}

impl<R: RangeReader + 'static, F: ScanlineDecoderFactory> Drop for SeriesScope<'_, R, F> {
    fn drop(&mut self) {
        self.reader.active_series = self.saved;
    }
}
