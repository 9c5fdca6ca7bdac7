use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_VISIBLE: usize = 20;
pub const DEFAULT_MAX_FILL_PAGES: u32 = 6;
pub const DEFAULT_MAX_MERGED_ITEMS: usize = 140;
pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;
pub const DEFAULT_CACHE_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WallConfig {
    /// Site origin used to absolutise relative details links
    pub origin: String,
    /// Visible items the auto-filler tries to reach after filtering
    pub target_visible: usize,
    /// Page fetch attempts per fill cycle
    pub max_fill_pages: u32,
    /// Items held by the listing before auto-fill stops
    pub max_merged_items: usize,
    /// Concurrent detail fetches
    pub fetch_concurrency: usize,
    pub cache_ttl_secs: i64,
    /// Optional bound on cached entries; oldest entries are evicted past it
    pub cache_max_entries: Option<usize>,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            target_visible: DEFAULT_TARGET_VISIBLE,
            max_fill_pages: DEFAULT_MAX_FILL_PAGES,
            max_merged_items: DEFAULT_MAX_MERGED_ITEMS,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: None,
        }
    }
}

impl WallConfig {
    pub fn cache_ttl(&self) -> time::Duration {
        time::Duration::seconds(self.cache_ttl_secs.max(0))
    }
}
