use tokio::sync::oneshot;

use super::cache_key::CacheKey;
use super::cache_stats::CacheStats;
use super::store::{CacheLookup, InsertOutcome, Ttl, TtlStatus};

pub enum CacheMessage<V> {
    Get {
        key: CacheKey,
        reply: oneshot::Sender<CacheLookup<V>>,
    },
    Put {
        key: CacheKey,
        value: V,
        ttl: Ttl,
        replace: bool,
    },
    PutIfAbsent {
        key: CacheKey,
        value: V,
        ttl: Ttl,
        reply: oneshot::Sender<InsertOutcome>,
    },
    Delete {
        key: CacheKey,
        reply: oneshot::Sender<bool>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },
    HasKey {
        key: CacheKey,
        reply: oneshot::Sender<bool>,
    },
    Ttl {
        key: CacheKey,
        reply: oneshot::Sender<TtlStatus>,
    },
    Stats {
        reply: oneshot::Sender<CacheStats>,
    },
    Cleanup {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
