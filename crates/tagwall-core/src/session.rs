//! One browsing session: listing state, persisted selection, auto-fill and enrichment.

use crate::adapter::{PageAdapter, Presenter};
use crate::cache::MetadataCache;
use crate::config::WallConfig;
use crate::enrich::{EnrichReport, Enricher};
use crate::item::{ContextKey, Item, ListingQuery, RawItem};
use crate::pagination::{AutoFiller, FillLimits, FillReport, FillState, PaginationContext};
use crate::queue::TaskQueue;
use crate::selection::{FilterSelection, SelectionStore};
use crate::tags::TagLearningStore;
use crate::Store;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Wall {
    presenter: Arc<dyn Presenter>,
    tags: TagLearningStore,
    selections: SelectionStore,
    filler: AutoFiller,
    enricher: Enricher,
    scope: Mutex<ContextKey>,
    selection: Mutex<FilterSelection>,
    pagination: Mutex<PaginationContext>,
}

impl Wall {
    pub fn new(
        config: &WallConfig,
        store: Arc<dyn Store>,
        adapter: Arc<dyn PageAdapter>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let cache = MetadataCache::new(store.clone(), config.cache_ttl())
            .with_max_entries(config.cache_max_entries);
        Self::with_cache(config, store, cache, adapter, presenter)
    }

    /// Like [`Wall::new`] with a caller-built cache (custom clock, shared instance).
    pub fn with_cache(
        config: &WallConfig,
        store: Arc<dyn Store>,
        cache: MetadataCache,
        adapter: Arc<dyn PageAdapter>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let tags = TagLearningStore::new(store.clone());
        let filler = AutoFiller::new(adapter.clone(), presenter.clone(), FillLimits::from(config))
            .with_learner(tags.clone());
        let enricher = Enricher::new(
            adapter,
            cache,
            presenter.clone(),
            TaskQueue::new(config.fetch_concurrency),
            config.origin.clone(),
        );
        let empty = ListingQuery::default();
        Self {
            presenter,
            tags,
            selections: SelectionStore::new(store),
            filler,
            enricher,
            scope: Mutex::new(empty.context_key()),
            selection: Mutex::new(FilterSelection::default()),
            pagination: Mutex::new(PaginationContext::new(empty.signature(), 0)),
        }
    }

    fn ctx(&self) -> MutexGuard<'_, PaginationContext> {
        self.pagination.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn scope(&self) -> ContextKey {
        self.scope.lock().expect("poisoned").clone()
    }

    pub fn selection(&self) -> FilterSelection {
        self.selection.lock().expect("poisoned").clone()
    }

    /// Load a listing page the user navigated to. A new query signature
    /// starts a fresh pagination context; the same signature keeps the
    /// already-merged items and seen ids. Returns the visible count.
    pub fn open(
        &self,
        query: &ListingQuery,
        page_index: u32,
        raw_items: Vec<RawItem>,
    ) -> anyhow::Result<usize> {
        let scope = query.context_key();
        let selection = self.selections.load(&scope)?;
        let items = Item::from_raw_page(raw_items, page_index);
        let tags: Vec<&str> = items
            .iter()
            .flat_map(|i| i.tags.iter().map(String::as_str))
            .collect();
        self.tags.learn(&scope, &tags)?;

        *self.scope.lock().expect("poisoned") = scope;
        *self.selection.lock().expect("poisoned") = selection.clone();

        let signature = query.signature();
        let (snapshot, flags, visible) = {
            let mut ctx = self.ctx();
            if ctx.signature != signature {
                tracing::info!(signature = %signature, "new listing query; resetting pagination");
                *ctx = PaginationContext::new(signature, page_index);
            } else {
                ctx.current_page = page_index;
            }
            ctx.merge_page(page_index, items);
            let visible = ctx.listing.refilter(&selection);
            (ctx.listing.items().to_vec(), ctx.listing.flags().to_vec(), visible)
        };
        self.presenter.on_items_changed(&snapshot, &flags);
        Ok(visible)
    }

    fn apply_selection(&self, selection: FilterSelection) -> usize {
        *self.selection.lock().expect("poisoned") = selection.clone();
        let (snapshot, flags, visible) = {
            let mut ctx = self.ctx();
            let visible = ctx.listing.refilter(&selection);
            (ctx.listing.items().to_vec(), ctx.listing.flags().to_vec(), visible)
        };
        self.presenter.on_items_changed(&snapshot, &flags);
        visible
    }

    /// Replace the selection. Returns the new visible count.
    pub fn set_selection<S: AsRef<str>>(&self, tags: &[S]) -> anyhow::Result<usize> {
        let sel = self.selections.save(&self.scope(), tags.iter().map(AsRef::as_ref))?;
        Ok(self.apply_selection(sel))
    }

    pub fn toggle_tag(&self, tag: &str) -> anyhow::Result<usize> {
        let sel = self.selections.toggle(&self.scope(), tag)?;
        Ok(self.apply_selection(sel))
    }

    /// Reset the selection; learned tags are kept.
    pub fn clear_selection(&self) -> anyhow::Result<usize> {
        self.selections.clear(&self.scope())?;
        Ok(self.apply_selection(FilterSelection::default()))
    }

    /// Every tag learned for the current scope, not just the loaded page.
    pub fn known_tags(&self) -> anyhow::Result<Vec<String>> {
        self.tags.list(&self.scope())
    }

    pub async fn auto_fill(&self) -> FillReport {
        let scope = self.scope();
        let current = || self.selection();
        self.filler.fill(&self.pagination, &scope, &current).await
    }

    pub async fn enrich_visible(&self) -> EnrichReport {
        let visible = self.visible_items();
        self.enricher.enrich(&visible).await
    }

    pub fn fill_state(&self) -> FillState {
        self.ctx().state.clone()
    }

    pub fn items(&self) -> Vec<Item> {
        self.ctx().listing.items().to_vec()
    }

    pub fn visible_items(&self) -> Vec<Item> {
        self.ctx().listing.visible_items()
    }

    pub fn visible_count(&self) -> usize {
        self.ctx().listing.visible_count()
    }
}
