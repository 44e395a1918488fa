//! Block cache for the open path.
//!
//! Reading a slide's tag directories means many small reads at scattered
//! offsets: entry tables, out-of-line strip arrays, dates, scanner text.
//! Routing them through fixed-size cached blocks turns that into a few
//! large reads. Pixel data never goes through this cache.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::{Bytes, BytesMut};
use lru::LruCache;

use super::RangeReader;
use crate::error::IoError;

/// Default block size (64 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Default number of cached blocks (4 MiB at the default block size).
pub const DEFAULT_BLOCK_CACHE_CAPACITY: usize = 64;

/// LRU cache of fixed-size blocks in front of a [`RangeReader`].
pub struct BlockCache<R> {
    inner: Arc<R>,
    block_size: u64,
    blocks: Mutex<LruCache<u64, Bytes>>,
}

impl<R: RangeReader> BlockCache<R> {
    /// Cache of `capacity` blocks of `block_size` bytes. Zero values are
    /// raised to 1.
    pub fn with_capacity(inner: Arc<R>, block_size: usize, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            block_size: block_size.max(1) as u64,
            blocks: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &Arc<R> {
        &self.inner
    }

    fn blocks(&self) -> Result<MutexGuard<'_, LruCache<u64, Bytes>>, IoError> {
        self.blocks.lock().map_err(|_| IoError::Read {
            resource: self.inner.identifier().to_string(),
            message: "block cache lock poisoned".to_string(),
        })
    }

    /// Block `index`, from cache or from the wrapped reader. The last block
    /// of the resource may be short.
    fn block(&self, index: u64) -> Result<Bytes, IoError> {
        if let Some(block) = self.blocks()?.get(&index) {
            return Ok(block.clone());
        }

        let start = index * self.block_size;
        let len = self.block_size.min(self.inner.size().saturating_sub(start));
        let block = self.inner.read_exact_at(start, len as usize)?;
        self.blocks()?.put(index, block.clone());
        Ok(block)
    }
}

impl<R: RangeReader> RangeReader for BlockCache<R> {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let size = self.inner.size();
        let end = offset.saturating_add(len as u64);
        if end > size {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size,
            });
        }
        if len == 0 {
            return Ok(Bytes::new());
        }

        let first = offset / self.block_size;
        let last = (end - 1) / self.block_size;
        let skip = (offset % self.block_size) as usize;

        if first == last {
            return Ok(self.block(first)?.slice(skip..skip + len));
        }

        let mut out = BytesMut::with_capacity(len);
        for index in first..=last {
            let block = self.block(index)?;
            let from = if index == first { skip } else { 0 };
            let take = (block.len() - from).min(len - out.len());
            out.extend_from_slice(&block[from..from + take]);
        }
        Ok(out.freeze())
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}
