//! # Render Cache
//!
//! String-keyed, bounded store of rendered artifacts shared by every
//! segmentation pass in the process.
//!
//! - Keys are derived from content (the trimmed formula text, or style tag +
//!   language + code for highlighted code), so an identical unit rendered in
//!   a later pass is a hit.
//! - Entries are immutable once inserted; `set` on an existing key replaces
//!   the value (last writer wins).
//! - Bounded by LRU eviction; invalidation is whole-cache.
//!
//! Two process-wide instances exist: [`formula_cache`] for rendered formula
//! images and [`text_cache`] for laid-out text. Callers that want isolation
//! (tests, multiple sessions with different styles) construct their own
//! [`RenderCache`] and inject it.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use log::debug;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::formula::FormulaImage;
use crate::style::StyledText;

pub const DEFAULT_FORMULA_CAPACITY: usize = 30;
pub const DEFAULT_TEXT_CAPACITY: usize = 50;

/// Capacities for the process-wide caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub formula_capacity: usize,
    pub text_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            formula_capacity: DEFAULT_FORMULA_CAPACITY,
            text_capacity: DEFAULT_TEXT_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Resize the process-wide caches.
    pub fn apply(&self) {
        formula_cache().resize(self.formula_capacity);
        text_cache().resize(self.text_capacity);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

pub struct RenderCache<V> {
    name: &'static str,
    entries: Mutex<LruCache<String, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

impl<V: Clone> RenderCache<V> {
    /// A capacity of zero is treated as one.
    pub fn new(name: &'static str, cap: usize) -> Self {
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // Poisoning is ignored: entries are inserted whole.
    fn entries(&self) -> MutexGuard<'_, LruCache<String, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let found = self.entries().get(key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.entries().put(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains(key)
    }

    pub fn clear_all(&self) {
        let mut entries = self.entries();
        if !entries.is_empty() {
            debug!("clearing {} cache ({} entries)", self.name, entries.len());
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shrinking evicts least-recently-used entries.
    pub fn resize(&self, cap: usize) {
        self.entries().resize(capacity(cap));
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

impl<V> std::fmt::Debug for RenderCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCache").field("name", &self.name).finish()
    }
}

pub fn formula_cache() -> Arc<RenderCache<FormulaImage>> {
    static CACHE: OnceLock<Arc<RenderCache<FormulaImage>>> = OnceLock::new();
    CACHE
        .get_or_init(|| Arc::new(RenderCache::new("formula", DEFAULT_FORMULA_CAPACITY)))
        .clone()
}

pub fn text_cache() -> Arc<RenderCache<StyledText>> {
    static CACHE: OnceLock<Arc<RenderCache<StyledText>>> = OnceLock::new();
    CACHE
        .get_or_init(|| Arc::new(RenderCache::new("text", DEFAULT_TEXT_CAPACITY)))
        .clone()
}

/// Clears both process-wide caches.
pub fn clear_all_caches() {
    formula_cache().clear_all();
    text_cache().clear_all();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn set_then_get() {
        let cache = RenderCache::new("test", 4);
        assert_eq!(cache.get("a"), None);
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn last_writer_wins() {
        let cache = RenderCache::new("test", 4);
        cache.set("a", 1);
        cache.set("a", 2);
        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_all_empties_the_cache() {
        let cache = RenderCache::new("test", 4);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear_all();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = RenderCache::new("test", 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.get("a");
        cache.set("c", 3);

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let cache = RenderCache::new("test", 0);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache = RenderCache::new("test", 3);
        cache.set("a", 1);
        cache.get("a");
        cache.get("missing");

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.len, stats.capacity), (1, 1, 1, 3));
    }

    #[test]
    fn resize_shrinks_capacity() {
        let cache = RenderCache::new("test", 3);
        for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
            cache.set(key, i);
        }
        cache.resize(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("c"));
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(RenderCache::new("test", 64));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..8 {
                        cache.set(format!("{t}-{i}"), i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 32);
    }

    #[test]
    fn process_wide_instances_are_shared() {
        assert!(Arc::ptr_eq(&formula_cache(), &formula_cache()));
        assert!(Arc::ptr_eq(&text_cache(), &text_cache()));
    }
}
