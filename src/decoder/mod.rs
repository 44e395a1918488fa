//! Scanline decoder service.
//!
//! Images too large to decode in one go are read through a stateful
//! decoder session: it is initialized against the byte range of a strip
//! and a row window, then hands out decoded scanlines one row at a time.
//!
//! Sessions come from a [`ScanlineDecoderFactory`], asked once when the
//! reader opens. The factory is the seam where a missing codec surfaces as
//! a [`DependencyError`] rather than a malformed-file error.

mod jpeg;
mod raw;

use crate::error::{DecodeError, DependencyError};
use crate::io::ByteRange;

pub use jpeg::{JpegDecoderFactory, JpegScanlineDecoder};
pub use raw::{RawDecoderFactory, RawScanlineDecoder};

/// A stateful session that decodes one strip into scanlines.
///
/// At most one window is live per session; initializing again replaces it.
pub trait ScanlineDecoder {
    /// Start a session covering every row of the strip.
    fn initialize(&mut self, range: ByteRange, image_width: u32) -> Result<(), DecodeError>;

    /// Start a session holding only rows `start_row..start_row + row_count`.
    fn initialize_rows(
        &mut self,
        range: ByteRange,
        start_row: u32,
        row_count: u32,
        image_width: u32,
    ) -> Result<(), DecodeError>;

    /// Decoded bytes of `row`, or `None` if the row is outside the window.
    ///
    /// A missing row is not an error.
    fn scanline(&self, row: u32) -> Option<&[u8]>;

    /// Width of the decoded image in pixels (0 when idle).
    fn width(&self) -> u32;

    /// Height of the decoded image in pixels (0 when idle).
    fn height(&self) -> u32;

    /// Release the session. Calling it again is a no-op.
    fn close(&mut self);
}

/// Creates decoder sessions.
pub trait ScanlineDecoderFactory {
    type Decoder: ScanlineDecoder;

    /// Create an idle decoder.
    fn instantiate(&self) -> Result<Self::Decoder, DependencyError>;
}

/// First row and row count of a window clipped to `height`.
pub(crate) fn clip_window(start_row: u32, row_count: u32, height: u32) -> (u32, u32) {
    let start = start_row.min(height);
    let end = start_row.saturating_add(row_count).min(height);
    (start, end - start)
}
