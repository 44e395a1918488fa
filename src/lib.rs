//! # NDPI Reader
//!
//! A pyramidal multi-resolution reader for Hamamatsu NDPI slides.
//!
//! An NDPI file is a TIFF derivative holding a base image, a stack of
//! same-sized focal planes and a descending pyramid of reduced copies. The
//! base image is often far too large to decode in one piece, so this crate
//! serves arbitrary pixel rectangles by staging only the needed band of
//! scanlines through a pluggable decoder.
//!
//! ## Features
//!
//! - **Layout inference**: pyramid levels and focal planes are derived from
//!   sub-image geometry alone
//! - **Banded decoding**: large images are read through a stateful scanline
//!   window that survives across nearby requests
//! - **Direct decoding**: small images are decoded whole from their strips
//! - **Metadata**: acquisition date, physical pixel size, scanner properties
//!
//! ## Architecture
//!
//! - [`io`] - Range readers (file, memory) and the tag-parsing block cache
//! - [`mod@format`] - TIFF directory parsing, strip decoding, JPEG handling
//! - [`decoder`] - The scanline decoder service and its implementations
//! - [`slide`] - Layout, series descriptors, metadata and the reader itself
//! - [`config`] - Reader tunables
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ndpi_reader::{FileRangeReader, JpegDecoderFactory, PyramidReader, ReaderConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(FileRangeReader::open("slide.ndpi")?);
//!     let mut reader = PyramidReader::open(source, &JpegDecoderFactory, ReaderConfig::default())?;
//!
//!     let pixel_bytes = reader.series_descriptor(0).map_or(3, |s| s.pixel_bytes());
//!     let mut buf = vec![0u8; 256 * 256 * pixel_bytes];
//!     reader.read_region(0, 0, 4096, 4096, 256, 256, &mut buf)?;
//!
//!     let thumbnail = reader.read_thumbnail(0)?;
//!     println!("thumbnail: {} bytes", thumbnail.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod io;
pub mod slide;

// Re-export commonly used types
pub use config::{
    ReaderConfig, DEFAULT_DIRECT_DECODE_THRESHOLD, DEFAULT_THUMBNAIL_DIMENSION,
    DEFAULT_TILE_WORKING_SET_BYTES,
};
pub use decoder::{
    JpegDecoderFactory, JpegScanlineDecoder, RawDecoderFactory, RawScanlineDecoder,
    ScanlineDecoder, ScanlineDecoderFactory,
};
pub use error::{DecodeError, DependencyError, FormatError, IoError, ReaderError, TiffError};
pub use format::jpeg::{is_abbreviated_stream, is_complete_stream, merge_jpeg_tables};
pub use format::tiff::{ByteOrder, Ifd, IfdEntry, TiffDirectory, TiffHeader, TiffTag};
pub use io::{BlockCache, ByteRange, FileRangeReader, MemoryRangeReader, RangeReader};
pub use slide::{
    ImageMetadata, MetadataStore, PixelType, PyramidLayout, PyramidReader, ScannerProperties,
    SeriesDescriptor, WindowState,
};
