//! TIFF container parsing for pyramidal slides.
//!
//! - **Byte order**: declared in the header (II = little-endian,
//!   MM = big-endian); every multi-byte value is read through [`ByteOrder`].
//! - **Classic TIFF vs BigTIFF**: 32-bit vs 64-bit offsets, handled
//!   transparently by [`TiffHeader`].
//! - **IFD**: one tag directory per stored sub-image. NDPI files chain the
//!   base image, its Z-planes, the reduced pyramid levels and a few
//!   auxiliary images (macro, map) one after another.
//! - **Strips**: NDPI stores each sub-image as strips (usually a single
//!   JPEG strip), which [`strips`] decodes for small images.

mod directory;
mod parser;
pub mod strips;
mod tags;
mod values;

pub use directory::{Ifd, IfdEntry, TiffDirectory};
pub use parser::{ByteOrder, RawEntry, RawIfd, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
pub use strips::{read_strip_region, StripLayout};
pub use tags::{
    Compression, FieldType, PhotometricInterpretation, ResolutionUnit, TiffTag,
    VENDOR_THUMBNAIL_TAGS,
};
pub use values::{parse_ascii, parse_f64, parse_u32_array, parse_u64_array, ValueReader};
