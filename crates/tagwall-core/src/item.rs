//! Listing items, their identity, and query scoping keys.

use crate::tags::NormalizedTagSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scope under which learned tags and selections are tracked (the listing category).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextKey(String);

impl ContextKey {
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        let s = s.trim();
        if s.is_empty() {
            ContextKey("all".into())
        } else {
            ContextKey(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of the active listing parameters; pagination state is
/// keyed by it and reset whenever it changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySignature(String);

impl QuerySignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuerySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub kind: Option<String>,
}

impl ListingQuery {
    pub fn signature(&self) -> QuerySignature {
        fn part(v: &Option<String>) -> String {
            v.as_deref().map(str::trim).unwrap_or("").to_string()
        }
        let search = self
            .search
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        QuerySignature(format!(
            "cat={};q={};sort={};dir={};type={}",
            part(&self.category),
            search,
            part(&self.sort),
            part(&self.direction),
            part(&self.kind),
        ))
    }

    pub fn context_key(&self) -> ContextKey {
        ContextKey::new(self.category.clone().unwrap_or_default())
    }
}

/// One listing row as delivered by a page adapter, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawItem {
    pub id: String,
    pub title: String,
    pub raw_tag_text: String,
    pub details_url: String,
    pub download_url: Option<String>,
    pub size_text: Option<String>,
    pub date_text: Option<String>,
    pub seeds: Option<u32>,
    pub leech: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub raw_tag_text: String,
    pub tags: Vec<String>,
    pub source_page_index: u32,
    pub details_url: String,
    pub download_url: Option<String>,
    pub size_text: Option<String>,
    pub date_text: Option<String>,
    pub seeds: Option<u32>,
    pub leech: Option<u32>,
}

impl Item {
    /// Normalise a raw row. Rows without an id and without an `id=` in their
    /// details link have no stable identity and are dropped.
    pub fn from_raw(raw: RawItem, page_index: u32) -> Option<Self> {
        let id = match raw.id.trim() {
            "" => item_id_from_url(&raw.details_url)?,
            id => id.to_string(),
        };
        let title = match raw.title.trim() {
            "" => "Untitled".to_string(),
            t => t.to_string(),
        };
        Some(Item {
            id,
            title,
            tags: NormalizedTagSet::parse(&raw.raw_tag_text).into_vec(),
            raw_tag_text: raw.raw_tag_text,
            source_page_index: page_index,
            details_url: raw.details_url,
            download_url: raw.download_url,
            size_text: raw.size_text,
            date_text: raw.date_text,
            seeds: raw.seeds,
            leech: raw.leech,
        })
    }

    pub fn from_raw_page(raws: Vec<RawItem>, page_index: u32) -> Vec<Self> {
        raws.into_iter()
            .filter_map(|r| {
                let hint = r.details_url.clone();
                let item = Item::from_raw(r, page_index);
                if item.is_none() {
                    tracing::debug!(details = %hint, "dropping row without identity");
                }
                item
            })
            .collect()
    }
}

/// Value of the `id` query parameter of a details link.
pub fn item_id_from_url(url: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    let query = query.split('#').next().unwrap_or("");
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == "id")
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Absolute form of a listing link; used as the metadata cache key.
pub fn normalize_resource_id(origin: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let origin = origin.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{origin}{href}")
    } else {
        format!("{origin}/{href}")
    }
}
