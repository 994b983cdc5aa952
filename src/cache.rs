//! LRU cache of compatibility reports
//!
//! Keyed by the content hashes of the two normalized schemas. Reports are
//! immutable once inserted, so a single mutex around the map and recency
//! queue is all the coordination needed.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::checksum::Checksum;
use crate::report::CompatibilityReport;

/// (old content hash, new content hash)
pub type CacheKey = (Checksum, Checksum);

/// Thread-safe LRU cache with configurable capacity.
///
/// A capacity of zero disables caching.
pub struct ReportCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheInner {
    map: HashMap<CacheKey, Arc<CompatibilityReport>>,
    /// Access order (most recent at back)
    order: VecDeque<CacheKey>,
}

impl CacheInner {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

impl ReportCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a report, marking it most recently used
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CompatibilityReport>> {
        let mut cache = self.lock();
        match cache.map.get(key).cloned() {
            Some(report) => {
                cache.touch(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(report)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().map.contains_key(key)
    }

    /// Insert a report, evicting the least recently used entries when full.
    ///
    /// If the key is already present the existing report is kept and returned;
    /// both were computed from identical inputs.
    pub fn insert(&self, key: CacheKey, report: Arc<CompatibilityReport>) -> Arc<CompatibilityReport> {
        if self.capacity == 0 {
            return report;
        }
        let mut cache = self.lock();

        if let Some(existing) = cache.map.get(&key).cloned() {
            cache.touch(&key);
            return existing;
        }

        while cache.order.len() >= self.capacity {
            match cache.order.pop_front() {
                Some(old_key) => {
                    cache.map.remove(&old_key);
                }
                None => break,
            }
        }

        cache.map.insert(key.clone(), Arc::clone(&report));
        cache.order.push_back(key);
        report
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<CompatibilityReport>> {
        let mut cache = self.lock();
        cache.order.retain(|k| k != key);
        cache.map.remove(key)
    }

    pub fn clear(&self) {
        let mut cache = self.lock();
        cache.map.clear();
        cache.order.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}
