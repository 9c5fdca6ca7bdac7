//! Background metadata enrichment: cache lookups first, bounded fetches for the rest.

use crate::adapter::{PageAdapter, Presenter};
use crate::cache::MetadataCache;
use crate::error::WallError;
use crate::item::{normalize_resource_id, Item};
use crate::queue::TaskQueue;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Served from a fresh cache entry
    pub cached: usize,
    /// Fetched and found metadata
    pub fetched: usize,
    /// Fetched, nothing found; cached as a negative entry
    pub empty: usize,
    pub failed: usize,
    /// Already being fetched by an earlier call
    pub skipped: usize,
}

enum Outcome {
    Found,
    Empty,
}

/// Releases an in-flight key when its job ends, including by panic or when
/// the queued job is dropped without running.
struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}

#[derive(Clone)]
pub struct Enricher {
    adapter: Arc<dyn PageAdapter>,
    cache: MetadataCache,
    presenter: Arc<dyn Presenter>,
    queue: TaskQueue,
    origin: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Enricher {
    pub fn new(
        adapter: Arc<dyn PageAdapter>,
        cache: MetadataCache,
        presenter: Arc<dyn Presenter>,
        queue: TaskQueue,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            cache,
            presenter,
            queue,
            origin: origin.into(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Enrich `items` and wait until every scheduled fetch has settled.
    pub async fn enrich(&self, items: &[Item]) -> EnrichReport {
        let mut report = EnrichReport::default();
        let mut handles = Vec::new();

        for item in items {
            let key = normalize_resource_id(&self.origin, &item.details_url);
            match self.cache.get(&key) {
                Ok(Some(entry)) => {
                    report.cached += 1;
                    if !entry.is_negative() {
                        self.presenter.on_metadata_ready(&item.id, &entry.fields);
                    }
                    continue;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "cache lookup failed"),
            }
            if !self.in_flight.lock().expect("poisoned").insert(key.clone()) {
                report.skipped += 1;
                continue;
            }
            let this = self.clone();
            let id = item.id.clone();
            let claim = InFlight {
                keys: self.in_flight.clone(),
                key: key.clone(),
            };
            handles.push(self.queue.submit(move || async move {
                let _claim = claim;
                this.fetch_one(&id, &key).await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(Ok(Outcome::Found)) => report.fetched += 1,
                Ok(Ok(Outcome::Empty)) => report.empty += 1,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "enrichment failed");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "enrichment task lost");
                    report.failed += 1;
                }
            }
        }
        tracing::debug!(?report, "enrichment settled");
        report
    }

    async fn fetch_one(&self, id: &str, key: &str) -> Result<Outcome, WallError> {
        let doc = self.adapter.fetch_item_detail(key).await?;
        let fields = self.adapter.extract_metadata(&doc);
        let entry = self.cache.set(key, fields)?;
        if entry.is_negative() {
            return Ok(Outcome::Empty);
        }
        self.presenter.on_metadata_ready(id, &entry.fields);
        Ok(Outcome::Found)
    }
}
