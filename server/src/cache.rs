//! Tool result caching.
//!
//! Every tool is a pure function of (snapshot, request), so results are keyed
//! by the snapshot generation plus the tool name and its canonical arguments.
//! A refresh bumps the generation and old entries simply age out of the LRU.

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Default number of cached tool results.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    generation: u64,
    tool: String,
    /// `serde_json` serializes object keys in sorted order, so equal
    /// argument maps give equal strings
    arguments: String,
}

/// LRU cache for tool results.
pub struct QueryCache {
    entries: Mutex<LruCache<CacheKey, Value>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Counters for the stats log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl QueryCache {
    /// Create a new cache with the specified capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn key(generation: u64, tool: &str, arguments: &Value) -> CacheKey {
        CacheKey {
            generation,
            tool: tool.to_string(),
            arguments: arguments.to_string(),
        }
    }

    pub fn get(&self, generation: u64, tool: &str, arguments: &Value) -> Option<Value> {
        let key = Self::key(generation, tool, arguments);
        let found = self.entries.lock().ok()?.get(&key).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    pub fn put(&self, generation: u64, tool: &str, arguments: &Value, result: Value) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.put(Self::key(generation, tool, arguments), result);
        }
    }

    /// Drop everything cached for older generations.
    pub fn evict_before(&self, generation: u64) {
        if let Ok(mut guard) = self.entries.lock() {
            let stale: Vec<CacheKey> = guard
                .iter()
                .filter(|(key, _)| key.generation < generation)
                .map(|(key, _)| key.clone())
                .collect();
            for key in stale {
                guard.pop(&key);
            }
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.lock().map(|g| g.len()).unwrap_or(0),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hit_after_put() {
        let cache = QueryCache::new(4);
        let args = json!({"query": "gloss"});
        assert!(cache.get(1, "search_by_capability", &args).is_none());

        cache.put(1, "search_by_capability", &args, json!([1, 2]));
        assert_eq!(
            cache.get(1, "search_by_capability", &args),
            Some(json!([1, 2]))
        );
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                misses: 1
            }
        );
    }

    #[test]
    fn test_generation_is_part_of_key() {
        let cache = QueryCache::new(4);
        let args = json!({});
        cache.put(1, "list_categories", &args, json!("old"));
        assert!(cache.get(2, "list_categories", &args).is_none());
    }

    #[test]
    fn test_argument_order_does_not_matter() {
        let cache = QueryCache::new(4);
        let a: Value = serde_json::from_str(r#"{"from_object":"Entry","to_object":"Sense"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"to_object":"Sense","from_object":"Entry"}"#).unwrap();
        cache.put(1, "get_navigation_path", &a, json!(true));
        assert_eq!(cache.get(1, "get_navigation_path", &b), Some(json!(true)));
    }

    #[test]
    fn test_evict_before() {
        let cache = QueryCache::new(8);
        let args = json!({});
        cache.put(1, "list_categories", &args, json!(1));
        cache.put(2, "list_categories", &args, json!(2));
        cache.evict_before(2);
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.get(2, "list_categories", &args), Some(json!(2)));
    }

    #[test]
    fn test_capacity_bound() {
        let cache = QueryCache::new(2);
        let args = json!({});
        for generation in 0..5 {
            cache.put(generation, "list_categories", &args, json!(generation));
        }
        assert_eq!(cache.stats().entries, 2);
    }
}
