//! In-memory response cache plugin.
//!
//! One instance joins two capability lists: as a short-circuit plugin
//! it answers repeat GETs from the cache without transport dispatch,
//! and as an observer it populates the cache from `did_receive`
//! snapshots (which carry both the built request and the recorded
//! response).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use courier_core::{Method, Response, ShortCircuitDecision};
use tracing::debug;

use crate::context::Snapshot;
use crate::plugin::{ObserverPlugin, PluginEntry, ShortCircuitPlugin};

/// Source tag carried by cache hits.
pub const CACHE_SOURCE: &str = "memory-cache";

/// TTL'd in-memory response cache for GET requests.
///
/// Successful responses are stored by final URL; while an entry is
/// fresh, `evaluate` answers [`ShortCircuitDecision::HitResult`] with
/// the source tag [`CACHE_SOURCE`] and the transport is never invoked.
/// Expired entries are replaced by the next origin response.
///
/// # Example
///
/// ```ignore
/// let cache = Arc::new(MemoryCache::new(Duration::from_secs(60)));
/// let engine = ExecutionEngine::builder()
///     .plugin(cache.entry())
///     .build();
/// ```
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    response: Response,
    stored_at: Instant,
}

impl MemoryCache {
    /// Create a cache whose entries stay fresh for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registration entry covering both capability lists.
    #[must_use]
    pub fn entry(self: &Arc<Self>) -> PluginEntry {
        PluginEntry::short_circuit(Arc::clone(self) as Arc<dyn ShortCircuitPlugin>)
            .and_observer(Arc::clone(self) as Arc<dyn ObserverPlugin>)
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn key(snapshot: &Snapshot) -> Option<String> {
        let request = snapshot.built_request()?;
        (request.method() == Method::GET).then(|| request.url().to_string())
    }

    fn fresh(&self, key: &str) -> Option<Response> {
        let entries = self.lock();
        let entry = entries.get(key)?;
        (entry.stored_at.elapsed() < self.ttl).then(|| entry.response.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl ShortCircuitPlugin for MemoryCache {
    async fn evaluate(&self, snapshot: &Snapshot) -> ShortCircuitDecision {
        let Some(key) = Self::key(snapshot) else {
            return ShortCircuitDecision::Miss;
        };
        match self.fresh(&key) {
            Some(response) => {
                debug!(%key, "cache hit");
                ShortCircuitDecision::hit_result_from(response, CACHE_SOURCE)
            }
            None => ShortCircuitDecision::Miss,
        }
    }
}

#[async_trait]
impl ObserverPlugin for MemoryCache {
    async fn did_receive(&self, snapshot: &Snapshot) {
        let Some(key) = Self::key(snapshot) else {
            return;
        };
        let Some(response) = snapshot.response() else {
            return;
        };
        if !response.is_success() {
            return;
        }
        // A fresh entry means this notification replays our own hit;
        // keep the original expiry.
        if self.fresh(&key).is_some() {
            return;
        }

        self.lock().insert(
            key,
            Entry {
                response: response.clone(),
                stored_at: Instant::now(),
            },
        );
    }
}
