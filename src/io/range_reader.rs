use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a slide file.
///
/// This abstraction lets the TIFF parser, the strip reader and the scanline
/// decoders fetch only the bytes they need instead of loading whole files.
/// Implementations must be thread-safe; reads are blocking.
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging).
    ///
    /// For local files, this is the path.
    fn identifier(&self) -> &str;
}

impl<R: RangeReader + ?Sized> RangeReader for Arc<R> {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        (**self).read_exact_at(offset, len)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }

    fn identifier(&self) -> &str {
        (**self).identifier()
    }
}

// =============================================================================
// ByteRange
// =============================================================================

/// A handle restricted to one contiguous byte span of a resource.
///
/// Staging opens one of these over exactly the first strip of a stored
/// sub-image and hands it to the scanline decoder, together with the
/// sub-image's shared JPEG tables when it has any. Offsets passed to
/// [`ByteRange::read_at`] are relative to the start of the span.
#[derive(Clone)]
pub struct ByteRange {
    source: Arc<dyn RangeReader>,
    offset: u64,
    len: u64,
    jpeg_tables: Option<Bytes>,
}

impl ByteRange {
    /// Open a span of `len` bytes at `offset`.
    ///
    /// Fails with `RangeOutOfBounds` if the span does not fit in the source.
    pub fn open(source: Arc<dyn RangeReader>, offset: u64, len: u64) -> Result<Self, IoError> {
        let size = source.size();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(Self {
                source,
                offset,
                len,
                jpeg_tables: None,
            }),
            _ => Err(IoError::RangeOutOfBounds {
                offset,
                requested: len,
                size,
            }),
        }
    }

    /// Attach the `JPEGTables` of the sub-image the span belongs to.
    pub fn with_jpeg_tables(mut self, tables: Option<Bytes>) -> Self {
        self.jpeg_tables = tables;
        self
    }

    /// Tables abbreviated strips in this span are decoded with.
    pub fn jpeg_tables(&self) -> Option<&[u8]> {
        self.jpeg_tables.as_deref()
    }

    /// Absolute offset of the span in the source.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the span in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Identifier of the underlying resource.
    pub fn identifier(&self) -> &str {
        self.source.identifier()
    }

    /// Read `len` bytes at `pos`, relative to the start of the span.
    pub fn read_at(&self, pos: u64, len: usize) -> Result<Bytes, IoError> {
        match pos.checked_add(len as u64) {
            Some(end) if end <= self.len => self.source.read_exact_at(self.offset + pos, len),
            _ => Err(IoError::RangeOutOfBounds {
                offset: self.offset.saturating_add(pos),
                requested: len as u64,
                size: self.offset + self.len,
            }),
        }
    }

    /// Read the whole span.
    pub fn read_all(&self) -> Result<Bytes, IoError> {
        self.source.read_exact_at(self.offset, self.len as usize)
    }
}

impl fmt::Debug for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteRange")
            .field("source", &self.source.identifier())
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("jpeg_tables", &self.jpeg_tables.as_ref().map(Bytes::len))
            .finish()
    }
}
