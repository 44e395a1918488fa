use thiserror::Error;

/// I/O errors that can occur when reading byte ranges from a slide file
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The file could not be opened
    #[error("Failed to open {path}: {message}")]
    Open { path: String, message: String },

    /// A seek or read on an open resource failed
    #[error("Read error on {resource}: {message}")]
    Read { resource: String, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
}

/// Errors that can occur when parsing TIFF files
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid IFD offset (points outside file or back into the chain)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from IFD
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Compression scheme the strip reader cannot decode
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors that make a container unusable as a pyramidal slide.
///
/// These are fatal at open time: the reader is never handed out with
/// partially built series metadata.
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// TIFF structure or tag data is malformed
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// The container holds no stored sub-images at all
    #[error("Malformed container: no stored sub-images")]
    EmptyContainer,

    /// Pyramid levels times Z-depth exceeds the stored sub-image count
    #[error(
        "Inconsistent pyramid layout: {pyramid_levels} levels x {z_depth} planes exceeds {image_count} stored sub-images"
    )]
    InconsistentLayout {
        pyramid_levels: usize,
        z_depth: usize,
        image_count: usize,
    },

    /// BitsPerSample/SampleFormat do not map to a known pixel type
    #[error("Unsupported pixel type: {bits_per_sample} bits per sample, sample format {sample_format}")]
    UnsupportedPixelType {
        bits_per_sample: u16,
        sample_format: u16,
    },
}

/// The scanline decoder service could not be instantiated.
///
/// Kept apart from [`FormatError`] so callers can tell a bad file from a
/// missing optional component.
#[derive(Debug, Clone, Error)]
#[error("Could not instantiate {service} decoder: {message}")]
pub struct DependencyError {
    /// Name of the decoder service
    pub service: &'static str,

    /// Why instantiation failed
    pub message: String,
}

/// Errors raised while decoding pixel data
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// I/O error while fetching compressed bytes
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The JPEG codec rejected the stream
    #[error("JPEG decode error: {message}")]
    Jpeg { message: String },

    /// Strip data ended before the expected number of bytes
    #[error("Truncated strip: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A decoded scanline is narrower than the series row
    #[error("Scanline {row} too short: expected at least {expected} bytes, got {actual}")]
    ShortScanline {
        row: u32,
        expected: usize,
        actual: usize,
    },

    /// Strip parameters are unusable (e.g. zero rows per strip)
    #[error("Invalid strip layout: {0}")]
    InvalidLayout(String),
}

/// Top-level error returned by [`crate::PyramidReader`]
#[derive(Debug, Clone, Error)]
pub enum ReaderError {
    /// The container is malformed or unsupported
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// The scanline decoder could not be instantiated
    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    /// I/O failure, propagated unchanged
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Pixel decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Series index outside `0..series_count`
    #[error("Series {series} out of range (series count is {count})")]
    SeriesOutOfRange { series: usize, count: usize },

    /// Plane index outside `0..image_count`
    #[error("Plane {plane} out of range (image count is {count})")]
    PlaneOutOfRange { plane: usize, count: usize },

    /// Requested rectangle is empty or leaves the image
    #[error("Region ({x}, {y}, {w}x{h}) outside {width}x{height} image")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        width: u32,
        height: u32,
    },

    /// Destination buffer cannot hold the requested rectangle
    #[error("Buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// The reader has been closed
    #[error("Reader is closed")]
    Closed,
}

impl From<TiffError> for ReaderError {
    fn from(err: TiffError) -> Self {
        match err {
            TiffError::Io(io) => ReaderError::Io(io),
            other => ReaderError::Format(FormatError::Tiff(other)),
        }
    }
}
