use tokio::sync::mpsc::{Sender, channel};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::engine::telemetry::{TelemetryBus, TelemetryEvent, event_names};
use crate::engine::types::SizeEstimate;
use crate::shared::config::CacheConfig;

use super::cache_key::CacheKey;
use super::cache_stats::CacheStats;
use super::message::CacheMessage;
use super::store::{CacheLookup, CacheStore, InsertOutcome, Ttl, TtlStatus};
use super::worker::run_worker_loop;

const LOG_TARGET: &str = "engine::cache::handle";

/// Cloneable handle to a cache worker. Operations never fail: when the worker
/// is gone, reads report a miss and writes are dropped with a warning.
pub struct ReportCache<V> {
    tx: Sender<CacheMessage<V>>,
    telemetry: Option<TelemetryBus>,
}

impl<V> Clone for ReportCache<V> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            telemetry: self.telemetry.clone(),
        }
    }
}

impl<V> std::fmt::Debug for ReportCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportCache")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<V> ReportCache<V>
where
    V: Clone + SizeEstimate + Send + 'static,
{
    /// Spawns the owning worker on the current tokio runtime.
    pub fn spawn(config: CacheConfig) -> Self {
        let (tx, rx) = channel(config.channel_capacity.max(1));
        let cleanup_interval = config.cleanup_interval();
        let store = CacheStore::new(config);

        tokio::spawn(async move {
            run_worker_loop(store, rx, cleanup_interval).await;
        });

        info!(target: LOG_TARGET, "Cache spawned");
        Self { tx, telemetry: None }
    }

    /// Publishes `cache.hit` / `cache.miss` on every lookup.
    pub fn with_telemetry(mut self, bus: TelemetryBus) -> Self {
        self.telemetry = Some(bus);
        self
    }

    pub async fn get(&self, key: &CacheKey) -> CacheLookup<V> {
        let lookup = self
            .request(|reply| CacheMessage::Get {
                key: key.clone(),
                reply,
            })
            .await
            .unwrap_or(CacheLookup::Miss);

        if let Some(bus) = &self.telemetry {
            let name = if lookup.is_hit() {
                event_names::CACHE_HIT
            } else {
                event_names::CACHE_MISS
            };
            bus.publish(TelemetryEvent::new(name).meta("key", key.as_str()));
        }
        lookup
    }

    /// Fire-and-forget insert. With `replace == false` an existing live
    /// entry is kept.
    pub async fn put(&self, key: CacheKey, value: V, ttl: Ttl, replace: bool) {
        self.send(CacheMessage::Put {
            key,
            value,
            ttl,
            replace,
        })
        .await;
    }

    pub async fn put_if_absent(&self, key: CacheKey, value: V, ttl: Ttl) -> InsertOutcome {
        self.request(|reply| CacheMessage::PutIfAbsent {
            key,
            value,
            ttl,
            reply,
        })
        .await
        .unwrap_or(InsertOutcome::AlreadyExists)
    }

    pub async fn delete(&self, key: &CacheKey) {
        self.request(|reply| CacheMessage::Delete {
            key: key.clone(),
            reply,
        })
        .await;
    }

    /// Removes everything and resets hit/miss/eviction counters.
    pub async fn clear(&self) {
        self.request(|reply| CacheMessage::Clear { reply }).await;
    }

    pub async fn has_key(&self, key: &CacheKey) -> bool {
        self.request(|reply| CacheMessage::HasKey {
            key: key.clone(),
            reply,
        })
        .await
        .unwrap_or(false)
    }

    pub async fn ttl(&self, key: &CacheKey) -> TtlStatus {
        self.request(|reply| CacheMessage::Ttl {
            key: key.clone(),
            reply,
        })
        .await
        .unwrap_or(TtlStatus::NotFound)
    }

    pub async fn stats(&self) -> CacheStats {
        self.request(|reply| CacheMessage::Stats { reply })
            .await
            .unwrap_or_default()
    }

    /// Forces an expiration + memory sweep now instead of waiting for the timer.
    pub async fn cleanup(&self) {
        self.request(|reply| CacheMessage::Cleanup { reply }).await;
    }

    pub async fn shutdown(&self) {
        self.request(|reply| CacheMessage::Shutdown { reply }).await;
    }

    async fn send(&self, msg: CacheMessage<V>) {
        if self.tx.send(msg).await.is_err() {
            warn!(target: LOG_TARGET, "Cache worker is gone; dropping write");
        }
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<R>) -> CacheMessage<V>,
    ) -> Option<R> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(build(reply_tx)).await.is_err() {
            warn!(target: LOG_TARGET, "Cache worker is gone");
            return None;
        }
        reply_rx.await.ok()
    }
}
