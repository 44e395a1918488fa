//! I/O layer: blocking range readers, byte-range handles and the block cache
//! used while parsing tag directories.

mod block_cache;
mod file_reader;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use file_reader::{FileRangeReader, MemoryRangeReader};
pub use range_reader::{ByteRange, RangeReader};
