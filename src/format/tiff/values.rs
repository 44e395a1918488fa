//! TIFF tag value loading and decoding.
//!
//! Values are either stored inline in the IFD entry or at an offset in the
//! file. [`ValueReader`] fetches the raw bytes for either case in one range
//! request; the free functions below turn those bytes into numbers and text
//! using the file's byte order.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, RawEntry, TiffHeader};
use super::tags::FieldType;

// =============================================================================
// ValueReader
// =============================================================================

/// Loads the value bytes of raw IFD entries.
pub struct ValueReader<'a, R: RangeReader> {
    reader: &'a R,
    header: &'a TiffHeader,
}

impl<'a, R: RangeReader> ValueReader<'a, R> {
    /// Create a new ValueReader.
    pub fn new(reader: &'a R, header: &'a TiffHeader) -> Self {
        Self { reader, header }
    }

    /// Byte order of the file.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Read the raw bytes of an entry's value.
    ///
    /// Inline values are copied out of the entry; out-of-line values are
    /// fetched from the file in a single read.
    pub fn read_bytes(&self, entry: &RawEntry) -> Result<Bytes, TiffError> {
        let size = entry
            .value_byte_size()
            .ok_or(TiffError::UnknownFieldType(entry.field_type_raw))?;

        if entry.is_inline {
            let size = (size as usize).min(entry.value_offset_bytes.len());
            Ok(Bytes::copy_from_slice(&entry.value_offset_bytes[..size]))
        } else {
            let offset = entry.value_offset(self.header.byte_order);
            let size = usize::try_from(size).map_err(|_| TiffError::InvalidTagValue {
                tag: "unknown",
                message: format!("value of {} bytes is too large", size),
            })?;
            Ok(self.reader.read_exact_at(offset, size)?)
        }
    }
}

// =============================================================================
// Decoding helpers
// =============================================================================

/// Parse an array of unsigned integers from raw bytes.
///
/// Accepts BYTE, SHORT, LONG and LONG8 values, widening each to u64. Other
/// field types produce an empty array.
pub fn parse_u64_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u64> {
    let width = match field_type {
        FieldType::Byte | FieldType::Undefined => 1,
        FieldType::Short => 2,
        FieldType::Long => 4,
        FieldType::Long8 => 8,
        _ => return Vec::new(),
    };

    bytes
        .chunks_exact(width)
        .take(count)
        .map(|chunk| match width {
            1 => chunk[0] as u64,
            2 => byte_order.read_u16(chunk) as u64,
            4 => byte_order.read_u32(chunk) as u64,
            _ => byte_order.read_u64(chunk),
        })
        .collect()
}

/// Parse an array of u32 values from raw bytes.
///
/// LONG8 values that do not fit are dropped.
pub fn parse_u32_array(
    bytes: &[u8],
    count: usize,
    field_type: FieldType,
    byte_order: ByteOrder,
) -> Vec<u32> {
    parse_u64_array(bytes, count, field_type, byte_order)
        .into_iter()
        .filter_map(|v| u32::try_from(v).ok())
        .collect()
}

/// Parse the first value of a numeric entry as a float.
///
/// Handles RATIONAL, FLOAT and DOUBLE as well as the integer types. A
/// rational with a zero denominator has no value.
pub fn parse_f64(bytes: &[u8], field_type: FieldType, byte_order: ByteOrder) -> Option<f64> {
    match field_type {
        FieldType::Rational => {
            if bytes.len() < 8 {
                return None;
            }
            let numerator = byte_order.read_u32(&bytes[0..4]);
            let denominator = byte_order.read_u32(&bytes[4..8]);
            (denominator != 0).then(|| numerator as f64 / denominator as f64)
        }
        FieldType::Float => {
            (bytes.len() >= 4).then(|| f32::from_bits(byte_order.read_u32(bytes)) as f64)
        }
        FieldType::Double => {
            (bytes.len() >= 8).then(|| f64::from_bits(byte_order.read_u64(bytes)))
        }
        other => parse_u64_array(bytes, 1, other, byte_order)
            .first()
            .map(|&v| v as f64),
    }
}

/// Parse an ASCII value, stopping at the first NUL.
pub fn parse_ascii(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// =============================================================================
// Tests
// =============================================================================
