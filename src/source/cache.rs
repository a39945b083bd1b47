//! Stamped-output cache
//!
//! Every stamping tool stores its result here so a later call can chain on
//! it through `cache_key` instead of shipping the bytes back and forth.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// One cached document and the tool that produced it
#[derive(Debug, Clone)]
pub struct CachedDocument {
    pub data: Arc<Vec<u8>>,
    pub produced_by: String,
}

struct CacheInner {
    lru: LruCache<String, CachedDocument>,
    total_bytes: usize,
}

/// LRU cache bounded by entry count and total bytes
pub struct DocumentCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

impl DocumentCache {
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Store `data` under a fresh key and return the key.
    ///
    /// Returns `None` when the document alone is larger than the byte
    /// budget. Older entries are evicted until the new one fits.
    pub fn insert(&self, data: Vec<u8>, produced_by: &str) -> Option<String> {
        let size = data.len();
        if size > self.max_bytes {
            tracing::debug!(size, max = self.max_bytes, "Output too large to cache");
            return None;
        }

        let mut inner = self.inner.lock();
        let key = loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !inner.lru.contains(&candidate) {
                break candidate;
            }
        };

        while inner.total_bytes + size > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((_, evicted)) => {
                    inner.total_bytes = inner.total_bytes.saturating_sub(evicted.data.len());
                }
                None => break,
            }
        }

        // A full LRU evicts on push; keep the byte count in step
        if let Some((_, evicted)) = inner.lru.push(
            key.clone(),
            CachedDocument {
                data: Arc::new(data),
                produced_by: produced_by.to_string(),
            },
        ) {
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.data.len());
        }
        inner.total_bytes += size;
        Some(key)
    }

    pub fn get(&self, key: &str) -> Option<CachedDocument> {
        self.inner.lock().lru.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().lru.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}
