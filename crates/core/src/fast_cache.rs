//! Short-lived memo of rendered lookup results.
//!
//! Keyed on the URL as requested. Values are the canonical JSON of an
//! error-free payload. Entries are add-only: a live entry is never
//! replaced, so when two requests race the first insert wins.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

/// Ephemeral key/value store with per-entry expiry.
#[async_trait]
pub trait FastCache: Send + Sync {
    /// Value stored under `key`, unless absent or expired.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for `ttl` unless a live entry exists.
    ///
    /// Returns `true` if this call inserted the value.
    async fn add_if_absent(&self, key: &str, value: String, ttl: Duration) -> bool;
}

#[derive(Clone, Debug)]
struct CachedJson {
    json: String,
    ttl: Duration,
}

/// Expire each entry after the TTL it was added with.
struct PerEntryTtl;

impl Expiry<String, CachedJson> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CachedJson, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process fast cache backed by moka.
///
/// Bounded by entry count; least recently used entries go first when full.
#[derive(Clone)]
pub struct MemoryCache {
    cache: Cache<String, CachedJson>,
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

#[async_trait]
impl FastCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.map(|cached| cached.json)
    }

    async fn add_if_absent(&self, key: &str, value: String, ttl: Duration) -> bool {
        let entry = self
            .cache
            .entry_by_ref(key)
            .or_insert(CachedJson { json: value, ttl })
            .await;
        entry.is_fresh()
    }
}
