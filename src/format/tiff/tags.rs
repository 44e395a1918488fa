//! Tag vocabulary of NDPI containers.
//!
//! Field types, the tag ids the reader looks up (standard baseline tags plus
//! the Hamamatsu private range) and the enumerated values some of them hold.

use std::fmt;

// =============================================================================
// TIFF Field Types
// =============================================================================

/// Encoding of an IFD entry value.
///
/// NDPI writers stick to these; signed integer and SRATIONAL entries are
/// left undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    Byte = 1,
    /// NUL-terminated text (DateTime, scanner properties)
    Ascii = 2,
    Short = 3,
    Long = 4,
    /// Numerator over denominator, both u32 (resolutions)
    Rational = 5,
    /// Opaque bytes (JPEGTables)
    Undefined = 7,
    /// f32 (source lens)
    Float = 11,
    Double = 12,
    /// u64 offsets and counts of BigTIFF-style NDPI files
    Long8 = 16,
}

impl FieldType {
    /// Bytes per value.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::Undefined => 1,
            FieldType::Short => 2,
            FieldType::Long | FieldType::Float => 4,
            FieldType::Rational | FieldType::Double | FieldType::Long8 => 8,
        }
    }

    /// Field type for a raw type id, `None` when the reader cannot decode it.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            7 => Some(FieldType::Undefined),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            16 => Some(FieldType::Long8),
            _ => None,
        }
    }

    /// Whether `count` values fit in the entry's value field (4 bytes, or 8
    /// in BigTIFF).
    #[inline]
    pub fn fits_inline(self, count: u64, is_bigtiff: bool) -> bool {
        let field = if is_bigtiff { 8 } else { 4 };
        (self.size_in_bytes() as u64).saturating_mul(count) <= field
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// TIFF tag IDs used by the slide reader.
///
/// Tags not listed here are still parsed and kept in the IFD (so they can be
/// removed by id), they just have no symbolic name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Geometry and pixel model
    // -------------------------------------------------------------------------
    /// Sub-image width; the layout resolver compares it across IFDs
    ImageWidth = 256,
    ImageLength = 257,
    /// Per-sample depth, one value per channel
    BitsPerSample = 258,
    Compression = 259,
    /// 2 for the RGB pyramid levels, 1 for gray macro images
    PhotometricInterpretation = 262,
    SamplesPerPixel = 277,
    /// Only 1 (interleaved) is read when more than one sample is stored
    PlanarConfiguration = 284,
    SampleFormat = 339,
    /// Presence marks a series as indexed
    ColorMap = 320,

    // -------------------------------------------------------------------------
    // Strips
    // -------------------------------------------------------------------------
    StripOffsets = 273,
    /// NDPI levels usually store the whole image as one strip
    RowsPerStrip = 278,
    StripByteCounts = 279,
    /// Shared tables for abbreviated strip streams
    JpegTables = 347,

    // -------------------------------------------------------------------------
    // Resolution and acquisition
    // -------------------------------------------------------------------------
    XResolution = 282,
    YResolution = 283,
    /// Missing means inch
    ResolutionUnit = 296,

    /// Acquisition timestamp, "YYYY:MM:DD HH:MM:SS"
    DateTime = 306,

    // -------------------------------------------------------------------------
    // Hamamatsu private tags
    // -------------------------------------------------------------------------
    /// Objective magnification of the scan (FLOAT)
    SourceLens = 65421,

    /// Embedded thumbnail blob, stripped before metadata is built
    VendorThumbnail = 65426,

    /// Second embedded thumbnail blob, stripped before metadata is built
    VendorThumbnailExtra = 65439,

    /// Scanner properties as `key=value` lines
    ScannerProperties = 65449,
}

impl TiffTag {
    /// Symbolic name for a tag id, if the reader knows it.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            273 => Some(TiffTag::StripOffsets),
            277 => Some(TiffTag::SamplesPerPixel),
            278 => Some(TiffTag::RowsPerStrip),
            279 => Some(TiffTag::StripByteCounts),
            282 => Some(TiffTag::XResolution),
            283 => Some(TiffTag::YResolution),
            284 => Some(TiffTag::PlanarConfiguration),
            296 => Some(TiffTag::ResolutionUnit),
            306 => Some(TiffTag::DateTime),
            320 => Some(TiffTag::ColorMap),
            339 => Some(TiffTag::SampleFormat),
            347 => Some(TiffTag::JpegTables),
            65421 => Some(TiffTag::SourceLens),
            65426 => Some(TiffTag::VendorThumbnail),
            65439 => Some(TiffTag::VendorThumbnailExtra),
            65449 => Some(TiffTag::ScannerProperties),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::SampleFormat => "SampleFormat",
            TiffTag::ColorMap => "ColorMap",
            TiffTag::StripOffsets => "StripOffsets",
            TiffTag::RowsPerStrip => "RowsPerStrip",
            TiffTag::StripByteCounts => "StripByteCounts",
            TiffTag::JpegTables => "JPEGTables",
            TiffTag::XResolution => "XResolution",
            TiffTag::YResolution => "YResolution",
            TiffTag::ResolutionUnit => "ResolutionUnit",
            TiffTag::DateTime => "DateTime",
            TiffTag::SourceLens => "SourceLens",
            TiffTag::VendorThumbnail => "VendorThumbnail",
            TiffTag::VendorThumbnailExtra => "VendorThumbnailExtra",
            TiffTag::ScannerProperties => "ScannerProperties",
        }
    }
}

/// Hamamatsu auxiliary tags removed from every IFD before series metadata is
/// built, so their blobs never reach generic metadata consumers.
pub const VENDOR_THUMBNAIL_TAGS: [TiffTag; 2] =
    [TiffTag::VendorThumbnail, TiffTag::VendorThumbnailExtra];

// =============================================================================
// Compression Values
// =============================================================================

/// How strip bytes are encoded.
///
/// NDPI pyramid levels are JPEG; small auxiliary images may be stored raw.
/// Any other scheme is kept by id so it can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Jpeg,
    Other(u16),
}

impl Compression {
    pub const fn from_u16(value: u16) -> Self {
        match value {
            1 => Compression::None,
            7 => Compression::Jpeg,
            other => Compression::Other(other),
        }
    }

    /// Whether the strip reader can decode this scheme.
    #[inline]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Compression::Other(_))
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("uncompressed"),
            Compression::Jpeg => f.write_str("JPEG"),
            Compression::Other(id) => write!(f, "scheme {}", id),
        }
    }
}

// =============================================================================
// Photometric Interpretation
// =============================================================================

/// Color space of the stored samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotometricInterpretation {
    WhiteIsZero,
    BlackIsZero,
    Rgb,
    Palette,
    TransparencyMask,
    Cmyk,
    YCbCr,
    CieLab,
}

impl PhotometricInterpretation {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::WhiteIsZero),
            1 => Some(Self::BlackIsZero),
            2 => Some(Self::Rgb),
            3 => Some(Self::Palette),
            4 => Some(Self::TransparencyMask),
            5 => Some(Self::Cmyk),
            6 => Some(Self::YCbCr),
            8 => Some(Self::CieLab),
            _ => None,
        }
    }
}

// =============================================================================
// Resolution Unit
// =============================================================================

/// Unit of XResolution/YResolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionUnit {
    None,
    Inch,
    Centimeter,
}

impl ResolutionUnit {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::None),
            2 => Some(Self::Inch),
            3 => Some(Self::Centimeter),
            _ => None,
        }
    }

    /// Microns per unit, or `None` when the unit carries no physical scale.
    pub const fn microns(self) -> Option<f64> {
        match self {
            ResolutionUnit::None => None,
            ResolutionUnit::Inch => Some(25_400.0),
            ResolutionUnit::Centimeter => Some(10_000.0),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
