//! Staged scanline window.
//!
//! Large sub-images are read through one live decoder session covering a
//! band of rows. The session is kept across requests and replaced only when
//! a request targets another (series, plane) or starts on a row the session
//! cannot produce.

use std::ops::Range;

use tracing::debug;

use crate::decoder::ScanlineDecoder;
use crate::error::{DecodeError, ReaderError};
use crate::io::ByteRange;

use super::series::SeriesDescriptor;

/// What the window currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowState {
    /// No live session.
    Unstaged,
    /// A session primed with `rows` of plane `plane` of `series`.
    Staged {
        series: usize,
        plane: usize,
        rows: Range<u32>,
    },
    /// The reader was closed; no further staging.
    Closed,
}

/// Rows to prime a new session with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priming {
    /// Every row of the image.
    FullHeight { height: u32 },
    /// Exactly `count` rows from `start`.
    Rows { start: u32, count: u32 },
}

impl Priming {
    /// A request for the optimal tile at the origin primes the whole image;
    /// anything else primes only the requested rows.
    pub fn for_request(series: &SeriesDescriptor, x: u32, y: u32, w: u32, h: u32) -> Self {
        if x == 0
            && y == 0
            && w == series.optimal_tile_width
            && h == series.optimal_tile_height
        {
            Priming::FullHeight {
                height: series.size_y,
            }
        } else {
            Priming::Rows { start: y, count: h }
        }
    }

    fn rows(self) -> Range<u32> {
        match self {
            Priming::FullHeight { height } => 0..height,
            Priming::Rows { start, count } => start..start.saturating_add(count),
        }
    }
}

/// Holds the single decoder session of a reader.
pub struct ScanlineWindowCache<D: ScanlineDecoder> {
    decoder: D,
    state: WindowState,
}

impl<D: ScanlineDecoder> ScanlineWindowCache<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            state: WindowState::Unstaged,
        }
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Whether a request for `row` of (`series`, `plane`) needs a new session.
    pub fn needs_stage(&self, series: usize, plane: usize, row: u32) -> Result<bool, ReaderError> {
        match &self.state {
            WindowState::Closed => Err(ReaderError::Closed),
            WindowState::Staged {
                series: s,
                plane: p,
                ..
            } if *s == series && *p == plane => Ok(self.decoder.scanline(row).is_none()),
            _ => Ok(true),
        }
    }

    /// Replace the live session with one over `range`.
    ///
    /// On failure the window is left unstaged.
    pub fn stage(
        &mut self,
        range: ByteRange,
        series: usize,
        plane: usize,
        image_width: u32,
        priming: Priming,
    ) -> Result<(), ReaderError> {
        if self.state == WindowState::Closed {
            return Err(ReaderError::Closed);
        }

        self.decoder.close();
        self.state = WindowState::Unstaged;

        debug!(
            series,
            plane,
            offset = range.offset(),
            len = range.len(),
            ?priming,
            "Staging scanline window"
        );

        match priming {
            Priming::FullHeight { .. } => self.decoder.initialize(range, image_width)?,
            Priming::Rows { start, count } => {
                self.decoder
                    .initialize_rows(range, start, count, image_width)?
            }
        }

        self.state = WindowState::Staged {
            series,
            plane,
            rows: priming.rows(),
        };
        Ok(())
    }

    /// Copy columns `col_start..col_start + out_stride` (in bytes) of rows
    /// `y..y + h` into `buf` at stride `out_stride`.
    ///
    /// Rows the session cannot produce are skipped, leaving `buf` as it was.
    /// Returns the number of rows copied.
    pub fn copy_rows(
        &self,
        y: u32,
        h: u32,
        col_start: usize,
        out_stride: usize,
        buf: &mut [u8],
    ) -> Result<u32, DecodeError> {
        let needed = col_start + out_stride;
        let mut copied = 0;

        for row in y..y + h {
            let Some(line) = self.decoder.scanline(row) else {
                continue;
            };
            if line.len() < needed {
                return Err(DecodeError::ShortScanline {
                    row,
                    expected: needed,
                    actual: line.len(),
                });
            }

            let dst = (row - y) as usize * out_stride;
            buf[dst..dst + out_stride].copy_from_slice(&line[col_start..needed]);
            copied += 1;
        }

        Ok(copied)
    }

    /// Release the session and refuse further staging.
    pub fn close(&mut self) {
        self.decoder.close();
        self.state = WindowState::Closed;
    }
}

impl<D: ScanlineDecoder> Drop for ScanlineWindowCache<D> {
    fn drop(&mut self) {
        self.decoder.close();
    }
}
