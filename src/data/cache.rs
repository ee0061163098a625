//! Load Cache
//! Remembers parsed DataFrames so unchanged input is not parsed twice.

use super::loader::{DataLoader, SourceFormat};
use crate::error::Result;
use log::debug;
use lru::LruCache;
use polars::prelude::DataFrame;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;

/// Default number of parsed files kept in memory.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// How entries leave the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Drop the least recently used entry once `capacity` is reached.
    LeastRecentlyUsed(NonZeroUsize),
    /// Keep every entry for the lifetime of the cache.
    Unbounded,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::LeastRecentlyUsed(
            NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        )
    }
}

/// Content hash plus declared format. Two different files can only share
/// an entry if their bytes are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: [u8; 32],
    format: SourceFormat,
}

impl CacheKey {
    pub fn new(content: &[u8], format: SourceFormat) -> Self {
        Self {
            digest: Sha256::digest(content).into(),
            format,
        }
    }
}

/// Parsed-file cache owned by a pipeline.
pub struct LoadCache {
    entries: LruCache<CacheKey, DataFrame>,
    hits: u64,
    misses: u64,
}

impl Default for LoadCache {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}

impl LoadCache {
    pub fn new(policy: EvictionPolicy) -> Self {
        let entries = match policy {
            EvictionPolicy::LeastRecentlyUsed(capacity) => LruCache::new(capacity),
            EvictionPolicy::Unbounded => LruCache::unbounded(),
        };
        Self {
            entries,
            hits: 0,
            misses: 0,
        }
    }

    /// Bounded cache. A capacity of zero falls back to one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(EvictionPolicy::LeastRecentlyUsed(
            NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        ))
    }

    /// Load through the cache. Failed parses are not stored.
    pub fn load(&mut self, content: &[u8], format: SourceFormat) -> Result<DataFrame> {
        let key = CacheKey::new(content, format);
        if let Some(df) = self.entries.get(&key) {
            self.hits += 1;
            debug!("Load cache hit ({format}, {} rows)", df.height());
            return Ok(df.clone());
        }

        self.misses += 1;
        debug!("Load cache miss ({format}, {} bytes)", content.len());
        let df = DataLoader::load_format(content, format)?;
        self.entries.put(key, df.clone());
        Ok(df)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
