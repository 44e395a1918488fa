//! Resolved tag directories.
//!
//! [`TiffDirectory::read`] walks the IFD chain once, loading every value
//! (inline or out-of-line) so later lookups never touch the file. Each
//! stored sub-image is one [`Ifd`], addressed by its 0-based position in
//! the chain.

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, RawIfd, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::tags::{FieldType, PhotometricInterpretation, ResolutionUnit, TiffTag};
use super::values::{parse_ascii, parse_f64, parse_u64_array, ValueReader};

/// Upper bound on the IFD chain length.
const MAX_IFDS: usize = 4096;

// =============================================================================
// IfdEntry
// =============================================================================

/// A tag entry with its value bytes loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct IfdEntry {
    /// Tag identifier
    pub tag_id: u16,

    /// Decoded field type, `None` if unknown
    pub field_type: Option<FieldType>,

    /// Field type as stored
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// Value bytes in file byte order (empty for unknown field types)
    pub data: Bytes,
}

impl IfdEntry {
    /// All values as unsigned integers.
    pub fn u64_values(&self, byte_order: ByteOrder) -> Vec<u64> {
        match self.field_type {
            Some(t) => parse_u64_array(&self.data, self.count as usize, t, byte_order),
            None => Vec::new(),
        }
    }

    /// The first value as an unsigned integer.
    pub fn first_u64(&self, byte_order: ByteOrder) -> Option<u64> {
        self.u64_values(byte_order).first().copied()
    }

    /// The first value as a float.
    pub fn first_f64(&self, byte_order: ByteOrder) -> Option<f64> {
        self.field_type
            .and_then(|t| parse_f64(&self.data, t, byte_order))
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// One stored sub-image's tag directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Ifd {
    /// Position in the IFD chain
    pub index: usize,

    /// Byte order of the containing file
    pub byte_order: ByteOrder,

    entries: BTreeMap<u16, IfdEntry>,
}

impl Ifd {
    /// Build an IFD from loaded entries.
    pub fn new(index: usize, byte_order: ByteOrder, entries: Vec<IfdEntry>) -> Self {
        Self {
            index,
            byte_order,
            entries: entries.into_iter().map(|e| (e.tag_id, e)).collect(),
        }
    }

    /// Get an entry by numeric tag id.
    pub fn get_entry(&self, tag_id: u16) -> Option<&IfdEntry> {
        self.entries.get(&tag_id)
    }

    /// Get an entry by known tag.
    pub fn get_entry_by_tag(&self, tag: TiffTag) -> Option<&IfdEntry> {
        self.get_entry(tag.as_u16())
    }

    /// Whether the directory holds `tag_id`.
    pub fn contains(&self, tag_id: u16) -> bool {
        self.entries.contains_key(&tag_id)
    }

    /// Remove a tag, returning its entry if it was present.
    pub fn remove(&mut self, tag_id: u16) -> Option<IfdEntry> {
        self.entries.remove(&tag_id)
    }

    /// Number of tags in the directory.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no tags.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tag ids in ascending order.
    pub fn tag_ids(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }

    fn u64_tag(&self, tag: TiffTag) -> Option<u64> {
        self.get_entry_by_tag(tag)
            .and_then(|e| e.first_u64(self.byte_order))
    }

    fn u16_tag(&self, tag: TiffTag) -> Option<u16> {
        self.u64_tag(tag).and_then(|v| u16::try_from(v).ok())
    }

    fn required_u32(&self, tag: TiffTag) -> Result<u32, TiffError> {
        let value = self.u64_tag(tag).ok_or(TiffError::MissingTag(tag.name()))?;
        u32::try_from(value).map_err(|_| TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("{} does not fit in 32 bits", value),
        })
    }

    /// Image width in pixels.
    pub fn image_width(&self) -> Result<u32, TiffError> {
        self.required_u32(TiffTag::ImageWidth)
    }

    /// Image height in pixels.
    pub fn image_height(&self) -> Result<u32, TiffError> {
        self.required_u32(TiffTag::ImageLength)
    }

    /// Samples per pixel (default 1).
    pub fn samples_per_pixel(&self) -> u16 {
        self.u16_tag(TiffTag::SamplesPerPixel).unwrap_or(1)
    }

    /// Bits per sample of the first channel (default 1).
    pub fn bits_per_sample(&self) -> u16 {
        self.u16_tag(TiffTag::BitsPerSample).unwrap_or(1)
    }

    /// Sample format of the first channel (default 1, unsigned).
    pub fn sample_format(&self) -> u16 {
        self.u16_tag(TiffTag::SampleFormat).unwrap_or(1)
    }

    /// Photometric interpretation, if present and known.
    pub fn photometric(&self) -> Option<PhotometricInterpretation> {
        self.u16_tag(TiffTag::PhotometricInterpretation)
            .and_then(PhotometricInterpretation::from_u16)
    }

    /// Whether multi-byte samples are little-endian.
    pub fn is_little_endian(&self) -> bool {
        self.byte_order.is_little_endian()
    }

    /// Compression scheme id (default 1, none).
    pub fn compression(&self) -> u16 {
        self.u16_tag(TiffTag::Compression).unwrap_or(1)
    }

    /// Planar configuration (default 1, chunky).
    pub fn planar_configuration(&self) -> u16 {
        self.u16_tag(TiffTag::PlanarConfiguration).unwrap_or(1)
    }

    /// Rows per strip, if present.
    pub fn rows_per_strip(&self) -> Option<u32> {
        self.u64_tag(TiffTag::RowsPerStrip)
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
    }

    /// Strip offsets in file order.
    pub fn strip_offsets(&self) -> Result<Vec<u64>, TiffError> {
        self.get_entry_by_tag(TiffTag::StripOffsets)
            .map(|e| e.u64_values(self.byte_order))
            .ok_or(TiffError::MissingTag(TiffTag::StripOffsets.name()))
    }

    /// Strip byte counts in file order.
    pub fn strip_byte_counts(&self) -> Result<Vec<u64>, TiffError> {
        self.get_entry_by_tag(TiffTag::StripByteCounts)
            .map(|e| e.u64_values(self.byte_order))
            .ok_or(TiffError::MissingTag(TiffTag::StripByteCounts.name()))
    }

    /// JPEGTables bytes, if present.
    pub fn jpeg_tables(&self) -> Option<Bytes> {
        self.get_entry_by_tag(TiffTag::JpegTables)
            .map(|e| e.data.clone())
            .filter(|d| !d.is_empty())
    }

    /// Whether a ColorMap is present.
    pub fn has_color_map(&self) -> bool {
        self.get_entry_by_tag(TiffTag::ColorMap).is_some()
    }

    /// Horizontal resolution in pixels per unit.
    pub fn x_resolution(&self) -> Option<f64> {
        self.float(TiffTag::XResolution)
    }

    /// Vertical resolution in pixels per unit.
    pub fn y_resolution(&self) -> Option<f64> {
        self.float(TiffTag::YResolution)
    }

    /// Resolution unit (default inch).
    pub fn resolution_unit(&self) -> Option<ResolutionUnit> {
        match self.u16_tag(TiffTag::ResolutionUnit) {
            Some(value) => ResolutionUnit::from_u16(value),
            None => Some(ResolutionUnit::Inch),
        }
    }

    /// Text value of an ASCII (or byte) tag.
    pub fn text(&self, tag: TiffTag) -> Option<String> {
        self.get_entry_by_tag(tag)
            .filter(|e| {
                matches!(
                    e.field_type,
                    Some(FieldType::Ascii | FieldType::Byte | FieldType::Undefined)
                )
            })
            .map(|e| parse_ascii(&e.data))
    }

    /// First value of a numeric tag as a float.
    pub fn float(&self, tag: TiffTag) -> Option<f64> {
        self.get_entry_by_tag(tag)
            .and_then(|e| e.first_f64(self.byte_order))
    }
}

// =============================================================================
// TiffDirectory
// =============================================================================

/// All tag directories of a TIFF container, in chain order.
#[derive(Debug, Clone)]
pub struct TiffDirectory {
    /// Parsed file header
    pub header: TiffHeader,

    /// One IFD per stored sub-image
    pub ifds: Vec<Ifd>,
}

impl TiffDirectory {
    /// Read the header and the full IFD chain.
    ///
    /// Fails with `InvalidIfdOffset` if the chain points outside the file or
    /// loops back onto an IFD already read.
    pub fn read<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let size = reader.size();
        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(size) as usize;
        if header_len < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: size,
            });
        }

        let header_bytes = reader.read_exact_at(0, header_len)?;
        let header = TiffHeader::parse(&header_bytes, size)?;

        let ifds = Self::read_all_ifds(reader, &header)?;
        debug!(
            resource = reader.identifier(),
            bigtiff = header.is_bigtiff,
            ifd_count = ifds.len(),
            "Read TIFF directory"
        );

        Ok(Self { header, ifds })
    }

    fn read_all_ifds<R: RangeReader>(
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<Ifd>, TiffError> {
        let values = ValueReader::new(reader, header);
        let size = reader.size();

        let mut ifds = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            if ifds.len() >= MAX_IFDS {
                return Err(TiffError::InvalidTagValue {
                    tag: "NextIFD",
                    message: format!("IFD chain longer than {} entries", MAX_IFDS),
                });
            }
            if offset >= size || !seen.insert(offset) {
                return Err(TiffError::InvalidIfdOffset(offset));
            }

            let count_size = header.ifd_count_size();
            let count_bytes = reader.read_exact_at(offset, count_size)?;
            let entry_count = header.read_entry_count(&count_bytes);

            let ifd_size = RawIfd::calculate_size(entry_count, header)?;
            let end = offset.checked_add(ifd_size as u64);
            if end.map_or(true, |end| end > size) {
                return Err(TiffError::FileTooSmall {
                    required: end.unwrap_or(u64::MAX),
                    actual: size,
                });
            }
            let ifd_bytes = reader.read_exact_at(offset, ifd_size)?;
            let raw = RawIfd::parse(&ifd_bytes, header)?;

            let mut entries = Vec::with_capacity(raw.entries.len());
            for entry in &raw.entries {
                let data = match entry.field_type {
                    Some(_) => values.read_bytes(entry)?,
                    None => Bytes::new(),
                };
                entries.push(IfdEntry {
                    tag_id: entry.tag_id,
                    field_type: entry.field_type,
                    field_type_raw: entry.field_type_raw,
                    count: entry.count,
                    data,
                });
            }

            ifds.push(Ifd::new(ifds.len(), header.byte_order, entries));
            offset = raw.next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Number of stored sub-images.
    pub fn len(&self) -> usize {
        self.ifds.len()
    }

    /// Whether the container holds no sub-images.
    pub fn is_empty(&self) -> bool {
        self.ifds.is_empty()
    }

    /// Tag directory of stored sub-image `index`.
    pub fn get(&self, index: usize) -> Option<&Ifd> {
        self.ifds.get(index)
    }

    /// Remove `tag_id` from every IFD.
    pub fn remove_tag(&mut self, tag_id: u16) {
        for ifd in &mut self.ifds {
            ifd.remove(tag_id);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
