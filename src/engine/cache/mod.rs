pub mod cache_entry;
pub mod cache_key;
pub mod cache_stats;
pub mod handle;
pub mod message;
pub mod store;
pub mod worker;

pub use cache_entry::{CacheEntry, Expiry};
pub use cache_key::{CacheKey, build_key};
pub use cache_stats::CacheStats;
pub use handle::ReportCache;
pub use message::CacheMessage;
pub use store::{CacheLookup, CacheStore, InsertOutcome, Ttl, TtlStatus};
