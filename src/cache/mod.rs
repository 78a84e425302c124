//! Time-bounded response cache.
//!
//! Holds standardized records keyed by provider identity and a
//! whitespace/case-normalized address. Expired entries are treated as
//! absent on read and physically removed by [`ResponseCache::purge_expired`],
//! optionally driven by a background sweeper.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::CanonicalPropertyRecord;

/// 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Collapse runs of whitespace and ignore case, so trivially different
/// spellings of one address share an entry.
pub fn normalize_address_key(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    provider_id: String,
    address: String,
}

impl CacheKey {
    pub fn new(provider_id: &str, address: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            address: normalize_address_key(address),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    record: CanonicalPropertyRecord,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match (now - self.inserted_at).to_std() {
            Ok(age) => age < self.ttl,
            // Clock stepped backwards; the entry cannot be older than its TTL.
            Err(_) => true,
        }
    }
}

/// Shared cache of standardized provider records.
///
/// Safe for concurrent use across requests; racing writes to one key
/// resolve last-write-wins.
#[derive(Debug)]
pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up a record that is still within its TTL.
    pub async fn get(&self, provider_id: &str, address: &str) -> Option<CanonicalPropertyRecord> {
        self.get_at(provider_id, address, Utc::now()).await
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    pub async fn get_at(
        &self,
        provider_id: &str,
        address: &str,
        now: DateTime<Utc>,
    ) -> Option<CanonicalPropertyRecord> {
        let key = CacheKey::new(provider_id, address);
        let entries = self.entries.read().await;

        match entries.get(&key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.record.clone()),
            Some(_) => {
                debug!("Cache entry expired for {} / {}", provider_id, key.address);
                None
            }
            None => None,
        }
    }

    /// Store a record, replacing whatever was there.
    pub async fn set(
        &self,
        provider_id: &str,
        address: &str,
        record: CanonicalPropertyRecord,
        ttl: Duration,
    ) {
        let key = CacheKey::new(provider_id, address);
        let entry = CacheEntry {
            record,
            inserted_at: Utc::now(),
            ttl,
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Physically drop expired entries. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Periodically purge expired entries until the cache is dropped.
pub fn spawn_sweeper(cache: &Arc<ResponseCache>, every: Duration) -> JoinHandle<()> {
    let cache = Arc::downgrade(cache);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(cache) = cache.upgrade() else {
                debug!("Response cache dropped, stopping sweeper");
                break;
            };
            let removed = cache.purge_expired().await;
            if removed > 0 {
                debug!("Swept {} expired cache entries", removed);
            }
        }
    })
}
