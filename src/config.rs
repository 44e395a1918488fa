//! Reader configuration.
//!
//! [`ReaderConfig`] collects the tunables of the read path. It can be built
//! three ways:
//! - `ReaderConfig::default()` in code
//! - flattened into a host application's clap CLI, with `NDPI_` environment
//!   variables as fallbacks
//! - deserialized from a config file (camelCase keys)
//!
//! # Environment Variables
//!
//! - `NDPI_DIRECT_DECODE_THRESHOLD` - Largest side decoded whole (default: 8192)
//! - `NDPI_TILE_WORKING_SET_BYTES` - Bytes per optimal tile band (default: 1 MiB)
//! - `NDPI_THUMBNAIL_DIMENSION` - Longest thumbnail side (default: 128)
//! - `NDPI_BLOCK_SIZE` - Block size used while parsing tags (default: 64 KiB)
//! - `NDPI_BLOCK_CACHE_CAPACITY` - Blocks kept while parsing tags (default: 64)
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use ndpi_reader::ReaderConfig;
//!
//! #[derive(Parser)]
//! struct Cli {
//!     path: std::path::PathBuf,
//!     #[command(flatten)]
//!     reader: ReaderConfig,
//! }
//! ```

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::io::{DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Images with both sides at or below this many pixels are decoded whole.
pub const DEFAULT_DIRECT_DECODE_THRESHOLD: u32 = 8192;

/// Working-set size used to derive the optimal tile height (1 MiB).
pub const DEFAULT_TILE_WORKING_SET_BYTES: usize = 1024 * 1024;

/// Longest side of a generated thumbnail.
pub const DEFAULT_THUMBNAIL_DIMENSION: u32 = 128;

// =============================================================================
// ReaderConfig
// =============================================================================

/// Tunables for opening and reading a slide.
#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReaderConfig {
    /// Largest image side (pixels) decoded by whole strips; larger images
    /// are staged through the scanline decoder.
    #[arg(
        long,
        default_value_t = DEFAULT_DIRECT_DECODE_THRESHOLD,
        env = "NDPI_DIRECT_DECODE_THRESHOLD"
    )]
    pub direct_decode_threshold: u32,

    /// Bytes one optimal tile band should occupy.
    #[arg(
        long,
        default_value_t = DEFAULT_TILE_WORKING_SET_BYTES,
        env = "NDPI_TILE_WORKING_SET_BYTES"
    )]
    pub tile_working_set_bytes: usize,

    /// Longest side of a thumbnail in pixels.
    #[arg(
        long,
        default_value_t = DEFAULT_THUMBNAIL_DIMENSION,
        env = "NDPI_THUMBNAIL_DIMENSION"
    )]
    pub thumbnail_dimension: u32,

    /// Block size in bytes for the tag-directory block cache.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, env = "NDPI_BLOCK_SIZE")]
    pub block_size: usize,

    /// Number of blocks the tag-directory block cache keeps.
    #[arg(
        long,
        default_value_t = DEFAULT_BLOCK_CACHE_CAPACITY,
        env = "NDPI_BLOCK_CACHE_CAPACITY"
    )]
    pub block_cache_capacity: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            direct_decode_threshold: DEFAULT_DIRECT_DECODE_THRESHOLD,
            tile_working_set_bytes: DEFAULT_TILE_WORKING_SET_BYTES,
            thumbnail_dimension: DEFAULT_THUMBNAIL_DIMENSION,
            block_size: DEFAULT_BLOCK_SIZE,
            block_cache_capacity: DEFAULT_BLOCK_CACHE_CAPACITY,
        }
    }
}

impl ReaderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.direct_decode_threshold == 0 {
            return Err("direct_decode_threshold must be greater than 0".to_string());
        }
        if self.tile_working_set_bytes == 0 {
            return Err("tile_working_set_bytes must be greater than 0".to_string());
        }
        if self.thumbnail_dimension == 0 {
            return Err("thumbnail_dimension must be greater than 0".to_string());
        }
        if self.block_size < 1024 || self.block_size > 16 * 1024 * 1024 {
            return Err("block_size must be between 1KB and 16MB".to_string());
        }
        if self.block_cache_capacity == 0 {
            return Err("block_cache_capacity must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Same configuration with a different direct-decode threshold.
    pub fn with_direct_decode_threshold(mut self, threshold: u32) -> Self {
        self.direct_decode_threshold = threshold;
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
