//! Content raster cache for generated node content.
//!
//! Pattern tiles, chart rasters and filtered images are expensive to produce,
//! so the software engine keeps the encoded PNG per node. An entry is reused
//! only while the node's content and filters are unchanged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use sheet_core::{ImageFilters, NodeContent, NodeId};

/// An encoded raster of node content.
#[derive(Debug, Clone)]
pub struct ContentRaster {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG bytes.
    pub png: Arc<[u8]>,
}

/// Entry in the content cache.
#[derive(Debug)]
struct CacheEntry {
    /// What the raster was produced from.
    source: (NodeContent, ImageFilters),
    raster: ContentRaster,
    last_accessed: Instant,
}

/// Configuration for the content cache.
#[derive(Debug, Clone)]
pub struct ContentCacheConfig {
    /// Maximum total PNG bytes held.
    pub max_size_bytes: usize,
    /// Maximum number of entries.
    pub max_entries: usize,
}

impl Default for ContentCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 128 * 1024 * 1024, // 128 MB
            max_entries: 256,
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (absent or stale).
    pub misses: u64,
    /// Number of evictions.
    pub evictions: u64,
}

/// LRU cache of content rasters keyed by node.
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: HashMap<NodeId, CacheEntry>,
    config: ContentCacheConfig,
    current_size: usize,
    stats: CacheStats,
}

impl ContentCache {
    /// Create a cache with the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ContentCacheConfig::default())
    }

    /// Create a cache with custom limits.
    #[must_use]
    pub fn with_config(config: ContentCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            current_size: 0,
            stats: CacheStats::default(),
        }
    }

    /// Return the cached raster for `id`, producing it with `render` when the
    /// entry is missing or was made from different content.
    ///
    /// # Errors
    ///
    /// Propagates the error from `render`; the cache is left unchanged.
    pub fn get_or_render<E>(
        &mut self,
        id: NodeId,
        content: &NodeContent,
        filters: &ImageFilters,
        render: impl FnOnce() -> Result<ContentRaster, E>,
    ) -> Result<ContentRaster, E> {
        if let Some(entry) = self.entries.get_mut(&id) {
            if entry.source.0 == *content && entry.source.1 == *filters {
                entry.last_accessed = Instant::now();
                self.stats.hits += 1;
                return Ok(entry.raster.clone());
            }
        }

        self.stats.misses += 1;
        let raster = render()?;
        self.insert(id, (content.clone(), *filters), raster.clone());
        Ok(raster)
    }

    fn insert(&mut self, id: NodeId, source: (NodeContent, ImageFilters), raster: ContentRaster) {
        let size = raster.png.len();
        self.remove(id);
        self.evict_if_needed(size);
        self.current_size += size;
        self.entries.insert(
            id,
            CacheEntry {
                source,
                raster,
                last_accessed: Instant::now(),
            },
        );
    }

    /// Drop the entry for `id`.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if let Some(entry) = self.entries.remove(&id) {
            self.current_size -= entry.raster.png.len();
            true
        } else {
            false
        }
    }

    /// Drop entries whose node no longer exists.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        let stale: Vec<NodeId> = self.entries.keys().copied().filter(|id| !keep(*id)).collect();
        for id in stale {
            self.remove(id);
        }
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_size = 0;
    }

    /// Number of cached rasters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total cached bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.current_size
    }

    /// Hit/miss/eviction counters.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn evict_if_needed(&mut self, needed_bytes: usize) {
        while self.current_size + needed_bytes > self.config.max_size_bytes
            && !self.entries.is_empty()
        {
            self.evict_lru();
        }

        while self.entries.len() >= self.config.max_entries && !self.entries.is_empty() {
            self.evict_lru();
        }
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(id, _)| *id);

        if let Some(id) = oldest {
            if self.remove(id) {
                self.stats.evictions += 1;
            }
        }
    }
}
