//! Memo of projected vector → prototype index.

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};

/// Decimal places kept when quantizing a projection into a cache key.
pub const CACHE_KEY_DECIMALS: i32 = 8;

/// Projection quantized to [`CACHE_KEY_DECIMALS`] decimals.
///
/// Two projections share a key only if every coordinate rounds to the same
/// 8-decimal value, which keeps lookups stable across platforms whose last
/// float bits differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<i64>);

impl CacheKey {
    pub fn quantize(projection: &[f64]) -> Self {
        let scale = 10f64.powi(CACHE_KEY_DECIMALS);
        CacheKey(
            projection
                .iter()
                .map(|value| (value * scale).round() as i64)
                .collect(),
        )
    }
}

/// Hit/miss counters of a [`ProjectionCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Projection cache, unbounded unless a capacity is given.
///
/// With a capacity the least recently used entry is evicted first.
#[derive(Debug)]
pub struct ProjectionCache {
    entries: LruCache<CacheKey, usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ProjectionCache {
    pub fn new(capacity: Option<usize>) -> Self {
        let entries = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Cached index for `key`, counting the hit or miss.
    pub fn get(&mut self, key: &CacheKey) -> Option<usize> {
        match self.entries.get(key) {
            Some(&index) => {
                self.hits += 1;
                Some(index)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, index: usize) {
        let replaced = self.entries.push(key.clone(), index);
        if replaced.is_some_and(|(evicted, _)| evicted != key) {
            self.evictions += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantization_merges_sub_precision_noise() {
        assert_eq!(
            CacheKey::quantize(&[0.123456789, -2.0]),
            CacheKey::quantize(&[0.1234567891, -2.0000000001])
        );
        assert_ne!(
            CacheKey::quantize(&[0.12345678]),
            CacheKey::quantize(&[0.12345679])
        );
    }

    #[test]
    fn test_hits_and_misses_are_counted() {
        let mut cache = ProjectionCache::new(None);
        let key = CacheKey::quantize(&[1.0, 2.0]);
        assert_eq!(cache.get(&key), None);
        cache.insert(key.clone(), 3);
        assert_eq!(cache.get(&key), Some(3));
        assert_eq!(cache.get(&key), Some(3));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (2, 1, 1));
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let mut cache = ProjectionCache::new(Some(2));
        let a = CacheKey::quantize(&[1.0]);
        let b = CacheKey::quantize(&[2.0]);
        let c = CacheKey::quantize(&[3.0]);
        cache.insert(a.clone(), 0);
        cache.insert(b.clone(), 1);
        cache.get(&a);
        cache.insert(c.clone(), 2);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.get(&b), None);
        assert_eq!(cache.get(&a), Some(0));
        assert_eq!(cache.get(&c), Some(2));
    }
}
