#![allow(dead_code)]
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tagwall_core::{
    Clock, ExtractedMetadata, FetchError, Item, PageAdapter, Presenter, RawDocument, RawItem,
};
use time::OffsetDateTime;

pub fn raw(id: &str, tags: &str) -> RawItem {
    RawItem {
        id: id.to_string(),
        title: format!("Title {id}"),
        raw_tag_text: tags.to_string(),
        details_url: format!("details.php?id={id}"),
        ..Default::default()
    }
}

/// `count` rows with ids `{prefix}{n}` all tagged `tags`.
pub fn page_of(prefix: &str, count: usize, tags: &str) -> Vec<RawItem> {
    (0..count).map(|n| raw(&format!("{prefix}{n}"), tags)).collect()
}

/// Serves listing pages and detail pages from in-memory scripts.
#[derive(Default)]
pub struct ScriptedAdapter {
    pages: Mutex<HashMap<u32, Result<Vec<RawItem>, FetchError>>>,
    details: Mutex<HashMap<String, Result<ExtractedMetadata, FetchError>>>,
    pub page_calls: Mutex<Vec<u32>>,
    pub detail_calls: Mutex<Vec<String>>,
    broken_details: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay = Some(d);
        self
    }

    pub fn page(self, index: u32, items: Vec<RawItem>) -> Self {
        self.pages.lock().unwrap().insert(index, Ok(items));
        self
    }

    pub fn failing_page(self, index: u32) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(index, Err(FetchError::status(format!("page:{index}"), 503)));
        self
    }

    pub fn set_page(&self, index: u32, items: Vec<RawItem>) {
        self.pages.lock().unwrap().insert(index, Ok(items));
    }

    pub fn detail(self, resource: &str, meta: ExtractedMetadata) -> Self {
        self.details.lock().unwrap().insert(resource.to_string(), Ok(meta));
        self
    }

    pub fn failing_detail(self, resource: &str) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(resource.to_string(), Err(FetchError::transport(resource, "connection reset")));
        self
    }

    /// `extract_metadata` panics on this resource's document.
    pub fn panicking_detail(self, resource: &str) -> Self {
        self.broken_details.lock().unwrap().insert(resource.to_string());
        self
    }

    pub fn pages_fetched(&self) -> Vec<u32> {
        self.page_calls.lock().unwrap().clone()
    }

    pub fn details_fetched(&self) -> usize {
        self.detail_calls.lock().unwrap().len()
    }

    async fn pause(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageAdapter for ScriptedAdapter {
    async fn fetch_listing_page(&self, page_index: u32) -> Result<RawDocument, FetchError> {
        self.page_calls.lock().unwrap().push(page_index);
        self.pause().await;
        let scripted = self.pages.lock().unwrap().get(&page_index).cloned();
        let items = scripted.unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(RawDocument::new(
            format!("page:{page_index}"),
            serde_json::to_string(&items).unwrap(),
        ))
    }

    fn list_raw_items(&self, doc: &RawDocument) -> Vec<RawItem> {
        serde_json::from_str(&doc.body).unwrap_or_default()
    }

    async fn fetch_item_detail(&self, resource: &str) -> Result<RawDocument, FetchError> {
        self.detail_calls.lock().unwrap().push(resource.to_string());
        self.pause().await;
        let scripted = self.details.lock().unwrap().get(resource).cloned();
        let meta = scripted.unwrap_or_else(|| Ok(ExtractedMetadata::default()))?;
        Ok(RawDocument::new(resource, serde_json::to_string(&meta).unwrap()))
    }

    fn extract_metadata(&self, doc: &RawDocument) -> ExtractedMetadata {
        if self.broken_details.lock().unwrap().contains(&doc.url) {
            panic!("malformed details page: {}", doc.url);
        }
        serde_json::from_str(&doc.body).unwrap_or_default()
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub changes: Mutex<Vec<(usize, usize)>>,
    pub metadata: Mutex<Vec<(String, ExtractedMetadata)>>,
    pub status: Mutex<Vec<(usize, usize)>>,
}

impl Presenter for RecordingPresenter {
    fn on_items_changed(&self, items: &[Item], visible: &[bool]) {
        assert_eq!(items.len(), visible.len());
        let shown = visible.iter().filter(|v| **v).count();
        self.changes.lock().unwrap().push((items.len(), shown));
    }
    fn on_metadata_ready(&self, item_id: &str, fields: &ExtractedMetadata) {
        self.metadata.lock().unwrap().push((item_id.to_string(), fields.clone()));
    }
    fn on_auto_fill_status(&self, current: usize, target: usize) {
        self.status.lock().unwrap().push((current, target));
    }
}

pub struct ManualClock(Mutex<OffsetDateTime>);

impl ManualClock {
    pub fn at(unix: i64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(OffsetDateTime::from_unix_timestamp(unix).unwrap())))
    }

    pub fn advance(&self, d: time::Duration) {
        *self.0.lock().unwrap() += d;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}
