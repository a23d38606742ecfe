use std::time::Instant;

use super::cache_key::CacheKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(Instant),
}

impl Expiry {
    pub fn is_expired(&self, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => *at <= now,
        }
    }
}

/// Stored value plus the bookkeeping used for TTL and LRU decisions.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: CacheKey,
    pub value: V,
    pub inserted_at: Instant,
    pub expires_at: Expiry,
    pub access_count: u64,
    pub last_accessed: Instant,
    pub size_bytes: usize,
}

impl<V> CacheEntry<V> {
    pub fn new(key: CacheKey, value: V, now: Instant, expires_at: Expiry, size_bytes: usize) -> Self {
        Self {
            key,
            value,
            inserted_at: now,
            expires_at,
            access_count: 0,
            last_accessed: now,
            size_bytes,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_expired(now)
    }

    pub fn touch(&mut self, now: Instant) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
        self.access_count += 1;
    }
}
