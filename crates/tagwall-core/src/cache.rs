//! Per-resource metadata cache with lazy TTL expiry.
//!
//! Entries live under the `metadata-cache` namespace keyed by the absolute
//! details URL. Stale entries are never swept on read; they are ignored until
//! the next `set` overwrites them. A fetch that found nothing is cached too, as
//! an entry with no fields, so the same page is not fetched again within the TTL.

use crate::adapter::ExtractedMetadata;
use crate::{Namespace, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        crate::unix_now()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub fields: ExtractedMetadata,
    /// Unix seconds
    pub fetched_at: i64,
}

impl CacheEntry {
    /// True for a cached "nothing found" result.
    pub fn is_negative(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub negative: usize,
}

#[derive(Clone)]
pub struct MetadataCache {
    store: Arc<dyn Store>,
    ttl: Duration,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
}

impl MetadataCache {
    pub fn new(store: Arc<dyn Store>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            max_entries: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_entries(mut self, max: Option<usize>) -> Self {
        self.max_entries = max;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: i64) -> bool {
        now - entry.fetched_at <= self.ttl.whole_seconds()
    }

    fn decode(key: &str, raw: &str) -> Option<CacheEntry> {
        match serde_json::from_str(raw) {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<CacheEntry>> {
        let Some(raw) = self.store.get(Namespace::MetadataCache, key)? else {
            return Ok(None);
        };
        let now = self.clock.now().unix_timestamp();
        Ok(Self::decode(key, &raw).filter(|e| self.is_fresh(e, now)))
    }

    /// Stamp the current time and replace any prior entry. Invalid ratings
    /// are dropped; the rest of the record is kept.
    pub fn set(&self, key: &str, fields: ExtractedMetadata) -> anyhow::Result<CacheEntry> {
        let entry = CacheEntry {
            fields: fields.validated(),
            fetched_at: self.clock.now().unix_timestamp(),
        };
        self.store
            .set(Namespace::MetadataCache, key, &serde_json::to_string(&entry)?)?;
        tracing::debug!(key, negative = entry.is_negative(), "cached metadata");
        if let Some(max) = self.max_entries {
            self.evict_oldest(max)?;
        }
        Ok(entry)
    }

    fn evict_oldest(&self, max: usize) -> anyhow::Result<usize> {
        let rows = self.store.scan(Namespace::MetadataCache)?;
        if rows.len() <= max {
            return Ok(0);
        }
        let mut aged: Vec<(i64, String)> = rows
            .into_iter()
            .map(|(k, v)| {
                let ts = Self::decode(&k, &v).map(|e| e.fetched_at).unwrap_or(i64::MIN);
                (ts, k)
            })
            .collect();
        aged.sort();
        let excess = aged.len() - max;
        for (_, key) in aged.into_iter().take(excess) {
            self.store.delete(Namespace::MetadataCache, &key)?;
        }
        tracing::debug!(evicted = excess, "metadata cache over capacity");
        Ok(excess)
    }

    /// Explicit maintenance: delete entries past the TTL (and unreadable ones).
    pub fn prune_stale(&self) -> anyhow::Result<usize> {
        let now = self.clock.now().unix_timestamp();
        let mut removed = 0;
        for (k, v) in self.store.scan(Namespace::MetadataCache)? {
            let keep = Self::decode(&k, &v).is_some_and(|e| self.is_fresh(&e, now));
            if !keep && self.store.delete(Namespace::MetadataCache, &k)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn stats(&self) -> anyhow::Result<CacheStats> {
        let now = self.clock.now().unix_timestamp();
        let mut stats = CacheStats::default();
        for (k, v) in self.store.scan(Namespace::MetadataCache)? {
            stats.total += 1;
            match Self::decode(&k, &v) {
                Some(e) if self.is_fresh(&e, now) => {
                    stats.fresh += 1;
                    if e.is_negative() {
                        stats.negative += 1;
                    }
                }
                _ => stats.stale += 1,
            }
        }
        Ok(stats)
    }
}
