//! Seams to the site-specific page adapter and the presentation layer.

use crate::error::FetchError;
use crate::item::{Item, RawItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A fetched page body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    pub url: String,
    pub body: String,
}

impl RawDocument {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }
}

/// Fields pulled out of a details page. The core only caches what it is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl ExtractedMetadata {
    pub fn is_empty(&self) -> bool {
        self.thumbnail.is_none() && self.rating.is_none() && self.video_id.is_none()
    }

    /// Ratings must lie in (0, 10]; anything else is discarded.
    pub fn validated(mut self) -> Self {
        if let Some(r) = self.rating {
            if !(r.is_finite() && r > 0.0 && r <= 10.0) {
                tracing::debug!(rating = r, "discarding out-of-range rating");
                self.rating = None;
            }
        }
        self.thumbnail = self.thumbnail.filter(|s| !s.trim().is_empty());
        self.video_id = self.video_id.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Site-specific fetching and scraping.
#[async_trait]
pub trait PageAdapter: Send + Sync {
    async fn fetch_listing_page(&self, page_index: u32) -> Result<RawDocument, FetchError>;
    fn list_raw_items(&self, doc: &RawDocument) -> Vec<RawItem>;
    /// `resource` is the absolute details URL of the item.
    async fn fetch_item_detail(&self, resource: &str) -> Result<RawDocument, FetchError>;
    fn extract_metadata(&self, doc: &RawDocument) -> ExtractedMetadata;
}

/// Receives pipeline updates. Callbacks run on the pipeline's task and must
/// not call back into the session that issued them.
pub trait Presenter: Send + Sync {
    fn on_items_changed(&self, _items: &[Item], _visible: &[bool]) {}
    fn on_metadata_ready(&self, _item_id: &str, _fields: &ExtractedMetadata) {}
    fn on_auto_fill_status(&self, _current: usize, _target: usize) {}
}

#[derive(Default)]
pub struct NoopPresenter;
impl Presenter for NoopPresenter {}
