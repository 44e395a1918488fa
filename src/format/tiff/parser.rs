//! TIFF header and raw IFD parsing.
//!
//! NDPI files are classic TIFF, and some conversion tools rewrite them as
//! BigTIFF. Both headers are accepted:
//!
//! ```text
//! classic: order(2) 42(2) first_ifd(4)
//! BigTIFF: order(2) 43(2) 8(2) 0(2) first_ifd(8)
//! ```
//!
//! An IFD is an entry count, a run of fixed-size entries and the offset of
//! the next IFD. Values too large for an entry's value field live elsewhere
//! in the file and are fetched by [`super::values::ValueReader`].

use crate::error::TiffError;

use super::tags::FieldType;

// =============================================================================
// Constants
// =============================================================================

/// "II"
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;
/// "MM"
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

const VERSION_TIFF: u16 = 42;
const VERSION_BIGTIFF: u16 = 43;

pub const TIFF_HEADER_SIZE: usize = 8;
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Endianness of every multi-byte field, and of uncompressed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = take::<2>(bytes);
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = take::<4>(bytes);
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let raw = take::<8>(bytes);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }

    /// Whether samples stored in this order are little-endian.
    #[inline]
    pub const fn is_little_endian(self) -> bool {
        matches!(self, ByteOrder::LittleEndian)
    }
}

/// First `N` bytes of `bytes`. Panics if the slice is shorter; callers
/// check lengths before decoding.
#[inline]
fn take<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

// =============================================================================
// TiffHeader
// =============================================================================

/// The container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    /// 8-byte offsets and counts
    pub is_bigtiff: bool,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse the header from the first bytes of a file of `file_size` bytes.
    ///
    /// Anything other than II/MM, version 42/43 or an 8-byte BigTIFF offset
    /// width is rejected, as is a first IFD outside the file.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Checked as fixed byte patterns, so read as little-endian
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);

        let (is_bigtiff, first_ifd_offset) = match version {
            VERSION_TIFF => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }

                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }

                (true, byte_order.read_u64(&bytes[8..16]))
            }
            _ => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Bytes per IFD entry: tag, type, count and the value/offset field.
    #[inline]
    pub const fn ifd_entry_size(&self) -> usize {
        4 + 2 * self.offset_size()
    }

    /// Width of the entry count that opens an IFD.
    #[inline]
    pub const fn ifd_count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Width of file offsets, which is also the width of an entry's
    /// value/offset field and of the next-IFD link.
    #[inline]
    pub const fn offset_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }

    /// Read the entry count at the start of an IFD.
    pub fn read_entry_count(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u16(bytes) as u64
        }
    }
}

// =============================================================================
// Raw IFD
// =============================================================================

/// One IFD entry as it appears on disk.
///
/// `value_offset_bytes` holds the raw value/offset field: the value itself
/// when `is_inline`, otherwise the file offset of the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Tag identifier
    pub tag_id: u16,

    /// Decoded field type, `None` if the type is unknown
    pub field_type: Option<FieldType>,

    /// Field type as stored
    pub field_type_raw: u16,

    /// Number of values
    pub count: u64,

    /// Raw value/offset field (4 or 8 bytes)
    pub value_offset_bytes: Vec<u8>,

    /// Whether the value is stored in `value_offset_bytes`
    pub is_inline: bool,
}

impl RawEntry {
    /// Total byte size of the value, or `None` for unknown field types.
    pub fn value_byte_size(&self) -> Option<u64> {
        self.field_type
            .and_then(|t| (t.size_in_bytes() as u64).checked_mul(self.count))
    }

    /// File offset of an out-of-line value.
    pub fn value_offset(&self, byte_order: ByteOrder) -> u64 {
        if self.value_offset_bytes.len() >= 8 {
            byte_order.read_u64(&self.value_offset_bytes)
        } else {
            byte_order.read_u32(&self.value_offset_bytes) as u64
        }
    }
}

/// An IFD as stored: its entries plus the link to the next IFD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIfd {
    /// Entries in file order
    pub entries: Vec<RawEntry>,

    /// Offset of the next IFD, 0 at the end of the chain
    pub next_ifd_offset: u64,
}

impl RawIfd {
    /// Byte size of an IFD with `entry_count` entries.
    ///
    /// Fails when the count read from the file cannot describe a real IFD.
    pub fn calculate_size(entry_count: u64, header: &TiffHeader) -> Result<usize, TiffError> {
        usize::try_from(entry_count)
            .ok()
            .and_then(|n| n.checked_mul(header.ifd_entry_size()))
            .and_then(|n| n.checked_add(header.ifd_count_size() + header.offset_size()))
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: "IFDEntryCount",
                message: format!("{} entries overflow the IFD size", entry_count),
            })
    }

    /// Parse an IFD from bytes starting at its entry count.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let count_size = header.ifd_count_size();
        if bytes.len() < count_size {
            return Err(TiffError::FileTooSmall {
                required: count_size as u64,
                actual: bytes.len() as u64,
            });
        }

        let entry_count = header.read_entry_count(&bytes[..count_size]);
        let required = Self::calculate_size(entry_count, header)?;
        if bytes.len() < required {
            return Err(TiffError::FileTooSmall {
                required: required as u64,
                actual: bytes.len() as u64,
            });
        }

        let byte_order = header.byte_order;
        let entry_size = header.ifd_entry_size();
        let value_size = header.offset_size();

        let mut entries = Vec::with_capacity(entry_count as usize);
        for i in 0..entry_count as usize {
            let entry = &bytes[count_size + i * entry_size..count_size + (i + 1) * entry_size];

            let tag_id = byte_order.read_u16(&entry[0..2]);
            let field_type_raw = byte_order.read_u16(&entry[2..4]);
            let field_type = FieldType::from_u16(field_type_raw);

            let (count, value_start) = if header.is_bigtiff {
                (byte_order.read_u64(&entry[4..12]), 12)
            } else {
                (byte_order.read_u32(&entry[4..8]) as u64, 8)
            };

            let value_offset_bytes = entry[value_start..value_start + value_size].to_vec();
            let is_inline = field_type
                .map(|t| t.fits_inline(count, header.is_bigtiff))
                .unwrap_or(true);

            entries.push(RawEntry {
                tag_id,
                field_type,
                field_type_raw,
                count,
                value_offset_bytes,
                is_inline,
            });
        }

        let next_start = count_size + entry_count as usize * entry_size;
        let next_ifd_offset = if header.is_bigtiff {
            byte_order.read_u64(&bytes[next_start..next_start + 8])
        } else {
            byte_order.read_u32(&bytes[next_start..next_start + 4]) as u64
        };

        Ok(RawIfd {
            entries,
            next_ifd_offset,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
