use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

use crate::engine::types::SizeEstimate;
use crate::shared::config::CacheConfig;

use super::cache_entry::{CacheEntry, Expiry};
use super::cache_key::CacheKey;
use super::cache_stats::CacheStats;

const LOG_TARGET: &str = "engine::cache::store";

/// Fixed per-entry bookkeeping cost added to the value estimate.
const ENTRY_OVERHEAD_BYTES: usize = 96;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<V> {
    Hit(V),
    Miss,
}

impl<V> CacheLookup<V> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_option(self) -> Option<V> {
        match self {
            CacheLookup::Hit(v) => Some(v),
            CacheLookup::Miss => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    Remaining(Duration),
    Never,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the store's configured default.
    #[default]
    Default,
    Never,
    After(Duration),
}

impl From<Duration> for Ttl {
    fn from(value: Duration) -> Self {
        Ttl::After(value)
    }
}

/// Single-owner cache state. Not synchronised: the cache worker is the only
/// thing that touches it, which makes eviction decisions and counter updates
/// atomic with respect to callers.
///
/// Recency is tracked twice: by the `LruCache` ordering (used to pick eviction
/// victims) and by `CacheEntry::last_accessed` (reported to callers). Both are
/// bumped together on hits and inserts only.
pub struct CacheStore<V> {
    entries: LruCache<CacheKey, CacheEntry<V>>,
    config: CacheConfig,
    hits: u64,
    misses: u64,
    evictions: u64,
    current_bytes: usize,
}

impl<V: Clone + SizeEstimate> CacheStore<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: LruCache::unbounded(),
            config,
            hits: 0,
            misses: 0,
            evictions: 0,
            current_bytes: 0,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn get(&mut self, key: &CacheKey, now: Instant) -> CacheLookup<V> {
        let expired = match self.entries.peek(key) {
            None => {
                self.misses += 1;
                return CacheLookup::Miss;
            }
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.remove_entry(key);
            self.misses += 1;
            debug!(target: LOG_TARGET, key = %key, "Dropped expired entry on read");
            return CacheLookup::Miss;
        }

        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.touch(now);
                self.hits += 1;
                CacheLookup::Hit(entry.value.clone())
            }
            None => {
                self.misses += 1;
                CacheLookup::Miss
            }
        }
    }

    /// Inserts or overwrites. With `replace == false` an existing live entry
    /// wins and the call is a no-op.
    pub fn put(
        &mut self,
        key: CacheKey,
        value: V,
        ttl: Ttl,
        replace: bool,
        now: Instant,
    ) -> InsertOutcome {
        if !replace && self.contains_live(&key, now) {
            return InsertOutcome::AlreadyExists;
        }

        let expires_at = match self.resolve_ttl(ttl) {
            Some(ttl) => Expiry::At(now + ttl),
            None => Expiry::Never,
        };
        let size_bytes = value.estimated_size() + key.as_str().len() + ENTRY_OVERHEAD_BYTES;

        self.remove_entry(&key);
        let entry = CacheEntry::new(key.clone(), value, now, expires_at, size_bytes);
        self.entries.put(key, entry);
        self.current_bytes += size_bytes;

        self.evict_for_size();
        InsertOutcome::Inserted
    }

    pub fn delete(&mut self, key: &CacheKey) -> bool {
        self.remove_entry(key)
    }

    /// Drops every entry and zeroes all counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_bytes = 0;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Presence check that does not count as an access.
    pub fn has_key(&self, key: &CacheKey, now: Instant) -> bool {
        self.contains_live(key, now)
    }

    pub fn ttl(&self, key: &CacheKey, now: Instant) -> TtlStatus {
        match self.entries.peek(key) {
            None => TtlStatus::NotFound,
            Some(entry) => match entry.expires_at {
                Expiry::Never => TtlStatus::Never,
                Expiry::At(_) if entry.is_expired(now) => TtlStatus::NotFound,
                Expiry::At(at) => TtlStatus::Remaining(at.saturating_duration_since(now)),
            },
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            memory_usage_bytes: self.current_bytes,
            hit_count: self.hits,
            miss_count: self.misses,
            eviction_count: self.evictions,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry whose expiry has passed. Returns how many were dropped.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }

        if !expired.is_empty() {
            debug!(target: LOG_TARGET, removed = expired.len(), "Expired entries swept");
        }
        expired.len()
    }

    /// Evicts the least recently used share of current entries when the
    /// estimated footprint is above the configured limit.
    pub fn evict_for_memory(&mut self) -> usize {
        let limit = self.config.memory_limit_bytes();
        if self.current_bytes <= limit || self.entries.is_empty() {
            return 0;
        }

        let count = ratio_of(self.entries.len(), self.config.memory_eviction_ratio);
        let evicted = self.evict_lru(count);
        debug!(
            target: LOG_TARGET,
            evicted,
            memory_bytes = self.current_bytes,
            limit_bytes = limit,
            "Memory eviction"
        );
        evicted
    }

    /// One full maintenance pass: expirations first, then the memory check.
    pub fn run_maintenance(&mut self, now: Instant) {
        self.sweep_expired(now);
        self.evict_for_memory();
    }

    fn evict_for_size(&mut self) {
        let max_size = self.config.max_size;
        let len = self.entries.len();
        if len <= max_size {
            return;
        }

        let batch = ratio_of(max_size, self.config.size_eviction_ratio);
        let count = batch.max(len - max_size);
        let evicted = self.evict_lru(count);
        debug!(target: LOG_TARGET, evicted, max_size, "Size eviction");
    }

    fn evict_lru(&mut self, count: usize) -> usize {
        let mut evicted = 0;
        while evicted < count {
            match self.entries.pop_lru() {
                Some((_key, entry)) => {
                    self.current_bytes = self.current_bytes.saturating_sub(entry.size_bytes);
                    self.evictions += 1;
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    fn remove_entry(&mut self, key: &CacheKey) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.current_bytes = self.current_bytes.saturating_sub(entry.size_bytes);
                true
            }
            None => false,
        }
    }

    fn contains_live(&self, key: &CacheKey, now: Instant) -> bool {
        self.entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    fn resolve_ttl(&self, ttl: Ttl) -> Option<Duration> {
        match ttl {
            Ttl::Default => self.config.default_ttl(),
            Ttl::Never => None,
            Ttl::After(d) => Some(d),
        }
    }
}

/// `ratio` share of `n`, rounded down, never less than one.
fn ratio_of(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio.clamp(0.0, 1.0)).floor() as usize).max(1)
}
