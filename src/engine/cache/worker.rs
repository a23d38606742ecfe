use std::time::{Duration, Instant};

use tokio::sync::mpsc::Receiver;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::engine::types::SizeEstimate;

use super::message::CacheMessage;
use super::store::CacheStore;

const LOG_TARGET: &str = "engine::cache::worker";

/// Owns the store and serialises every operation on it. A timer drives the
/// expiration and memory sweeps independently of caller traffic.
pub async fn run_worker_loop<V>(
    mut store: CacheStore<V>,
    mut rx: Receiver<CacheMessage<V>>,
    cleanup_interval: Duration,
) where
    V: Clone + SizeEstimate + Send + 'static,
{
    info!(
        target: LOG_TARGET,
        max_size = store.config().max_size,
        memory_limit_mb = store.config().memory_limit_mb,
        "Cache worker started"
    );

    let mut sweep = interval(cleanup_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so a fresh cache is not swept.
    sweep.tick().await;

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                if !handle_message(&mut store, msg) {
                    break;
                }
            }
            _ = sweep.tick() => {
                debug!(target: LOG_TARGET, entries = store.len(), "Periodic sweep");
                store.run_maintenance(Instant::now());
            }
        }
    }

    info!(target: LOG_TARGET, "Cache worker shutting down");
}

/// Applies one message. Returns false when the worker should stop.
/// Send failures on replies mean the caller gave up waiting; they are ignored.
fn handle_message<V>(store: &mut CacheStore<V>, msg: CacheMessage<V>) -> bool
where
    V: Clone + SizeEstimate,
{
    let now = Instant::now();
    match msg {
        CacheMessage::Get { key, reply } => {
            let _ = reply.send(store.get(&key, now));
        }
        CacheMessage::Put {
            key,
            value,
            ttl,
            replace,
        } => {
            store.put(key, value, ttl, replace, now);
        }
        CacheMessage::PutIfAbsent {
            key,
            value,
            ttl,
            reply,
        } => {
            let _ = reply.send(store.put(key, value, ttl, false, now));
        }
        CacheMessage::Delete { key, reply } => {
            let _ = reply.send(store.delete(&key));
        }
        CacheMessage::Clear { reply } => {
            store.clear();
            let _ = reply.send(());
        }
        CacheMessage::HasKey { key, reply } => {
            let _ = reply.send(store.has_key(&key, now));
        }
        CacheMessage::Ttl { key, reply } => {
            let _ = reply.send(store.ttl(&key, now));
        }
        CacheMessage::Stats { reply } => {
            let _ = reply.send(store.stats());
        }
        CacheMessage::Cleanup { reply } => {
            store.run_maintenance(now);
            let _ = reply.send(());
        }
        CacheMessage::Shutdown { reply } => {
            let _ = reply.send(());
            return false;
        }
    }
    true
}
