//! Listing auto-fill: fetch further pages until enough items survive the filter.

use crate::adapter::{PageAdapter, Presenter};
use crate::config::WallConfig;
use crate::error::FetchError;
use crate::item::{ContextKey, Item, QuerySignature};
use crate::listing::Listing;
use crate::selection::FilterSelection;
use crate::tags::TagLearningStore;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    /// The fetched page had no rows.
    EndOfListing,
    /// Every row on the fetched page was already merged.
    DuplicatePage,
    PageCap,
    ItemCap,
    /// The query changed while a page was in flight; its rows were discarded.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillState {
    Idle,
    Filling,
    Done(StopReason),
    Aborted(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillEvent {
    Start,
    Stop(StopReason),
    Failed(FetchError),
}

impl FillState {
    /// Pure transition function. A finished or aborted fill can be started
    /// again; stop and failure events only apply to a running fill.
    pub fn on(self, event: FillEvent) -> FillState {
        match (self, event) {
            (_, FillEvent::Start) => FillState::Filling,
            (FillState::Filling, FillEvent::Stop(reason)) => FillState::Done(reason),
            (FillState::Filling, FillEvent::Failed(err)) => FillState::Aborted(err),
            (state, event) => {
                tracing::debug!(?state, ?event, "ignoring fill event");
                state
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, FillState::Filling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillLimits {
    pub target_visible: usize,
    pub max_pages: u32,
    pub max_items: usize,
}

impl Default for FillLimits {
    fn default() -> Self {
        Self::from(&WallConfig::default())
    }
}

impl From<&WallConfig> for FillLimits {
    fn from(c: &WallConfig) -> Self {
        Self {
            target_visible: c.target_visible,
            max_pages: c.max_fill_pages,
            max_items: c.max_merged_items,
        }
    }
}

impl FillLimits {
    /// Bounds checked before each page fetch.
    pub fn check(
        &self,
        visible: usize,
        pages_attempted: u32,
        merged: usize,
    ) -> Option<StopReason> {
        if visible >= self.target_visible {
            Some(StopReason::TargetReached)
        } else if pages_attempted >= self.max_pages {
            Some(StopReason::PageCap)
        } else if merged >= self.max_items {
            Some(StopReason::ItemCap)
        } else {
            None
        }
    }
}

/// Session-scoped pagination state for one query signature.
#[derive(Debug, Clone)]
pub struct PaginationContext {
    pub signature: QuerySignature,
    /// Merged items; its identity index doubles as the seen-id set.
    pub listing: Listing,
    /// Page the user is looking at.
    pub current_page: u32,
    pub max_fetched_page: Option<u32>,
    pub state: FillState,
}

impl PaginationContext {
    pub fn new(signature: QuerySignature, current_page: u32) -> Self {
        Self {
            signature,
            listing: Listing::new(),
            current_page,
            max_fetched_page: None,
            state: FillState::Idle,
        }
    }

    pub fn next_page_index(&self) -> u32 {
        let after_current = self.current_page + 1;
        match self.max_fetched_page {
            Some(max) => after_current.max(max + 1),
            None => after_current,
        }
    }

    /// Merge a page's items, returning the ones that were not seen before.
    pub fn merge_page(&mut self, page_index: u32, items: Vec<Item>) -> Vec<Item> {
        let mut fresh = Vec::new();
        for item in items {
            if !self.listing.contains(&item.id) {
                fresh.push(item.clone());
                self.listing.merge(item);
            }
        }
        self.max_fetched_page = Some(
            self.max_fetched_page
                .map_or(page_index, |m| m.max(page_index)),
        );
        fresh
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillReport {
    pub state: FillState,
    /// False when no cycle ran (already running or target already met).
    pub started: bool,
    pub pages_fetched: u32,
    pub merged: usize,
    pub visible: usize,
}

pub struct AutoFiller {
    adapter: Arc<dyn PageAdapter>,
    presenter: Arc<dyn Presenter>,
    learner: Option<TagLearningStore>,
    limits: FillLimits,
}

fn lock(ctx: &Mutex<PaginationContext>) -> MutexGuard<'_, PaginationContext> {
    ctx.lock().unwrap_or_else(|e| e.into_inner())
}

/// Marks a cycle as running. If the `fill` future is dropped mid-cycle, the
/// context goes back to `Idle` so the next trigger can start a new cycle.
struct RunningFill<'a> {
    session: &'a Mutex<PaginationContext>,
    signature: QuerySignature,
    armed: bool,
}

impl Drop for RunningFill<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut ctx = lock(self.session);
        if ctx.signature == self.signature && ctx.state.is_running() {
            tracing::debug!(signature = %self.signature, "fill cycle cancelled");
            ctx.state = FillState::Idle;
        }
    }
}

impl AutoFiller {
    pub fn new(
        adapter: Arc<dyn PageAdapter>,
        presenter: Arc<dyn Presenter>,
        limits: FillLimits,
    ) -> Self {
        Self {
            adapter,
            presenter,
            learner: None,
            limits,
        }
    }

    /// Learn the tags of every newly merged item.
    pub fn with_learner(mut self, learner: TagLearningStore) -> Self {
        self.learner = Some(learner);
        self
    }

    pub fn limits(&self) -> FillLimits {
        self.limits
    }

    /// Run one fill cycle against `session`. `selection` is read after every
    /// merge so selection changes made while a page is in flight are honoured.
    /// A second call while a cycle is running returns immediately.
    pub async fn fill(
        &self,
        session: &Mutex<PaginationContext>,
        scope: &ContextKey,
        selection: &(dyn Fn() -> FilterSelection + Sync),
    ) -> FillReport {
        let target = self.limits.target_visible;
        let (signature, mut page) = {
            let mut ctx = lock(session);
            let visible = ctx.listing.refilter(&selection());
            if ctx.state.is_running() || visible >= target {
                tracing::debug!(
                    running = ctx.state.is_running(),
                    visible,
                    target,
                    "fill not started"
                );
                return FillReport {
                    state: ctx.state.clone(),
                    started: false,
                    pages_fetched: 0,
                    merged: 0,
                    visible,
                };
            }
            ctx.state = ctx.state.clone().on(FillEvent::Start);
            (ctx.signature.clone(), ctx.next_page_index())
        };
        let mut running = RunningFill {
            session,
            signature: signature.clone(),
            armed: true,
        };
        tracing::info!(signature = %signature, from_page = page, target, "auto-fill started");

        let mut pages_fetched = 0u32;
        let mut merged = 0usize;
        let event = loop {
            let (visible, len) = {
                let ctx = lock(session);
                (ctx.listing.visible_count(), ctx.listing.len())
            };
            if let Some(reason) = self.limits.check(visible, pages_fetched, len) {
                break FillEvent::Stop(reason);
            }

            pages_fetched += 1;
            let doc = match self.adapter.fetch_listing_page(page).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(page, error = %e, "listing page fetch failed");
                    break FillEvent::Failed(e);
                }
            };
            let raw = self.adapter.list_raw_items(&doc);
            if raw.is_empty() {
                break FillEvent::Stop(StopReason::EndOfListing);
            }
            let items = Item::from_raw_page(raw, page);

            let (snapshot, flags, visible, fresh) = {
                let mut ctx = lock(session);
                if ctx.signature != signature {
                    tracing::info!(page, "query changed during fill; discarding page");
                    return FillReport {
                        state: FillState::Done(StopReason::Superseded),
                        started: true,
                        pages_fetched,
                        merged,
                        visible: 0,
                    };
                }
                let fresh = ctx.merge_page(page, items);
                let visible = ctx.listing.refilter(&selection());
                (
                    ctx.listing.items().to_vec(),
                    ctx.listing.flags().to_vec(),
                    visible,
                    fresh,
                )
            };
            merged += fresh.len();
            tracing::debug!(page, fresh = fresh.len(), visible, "merged listing page");

            if let Some(learner) = &self.learner {
                let tags: Vec<&str> = fresh
                    .iter()
                    .flat_map(|i| i.tags.iter().map(String::as_str))
                    .collect();
                if let Err(e) = learner.learn(scope, &tags) {
                    tracing::warn!(error = %e, "failed to persist learned tags");
                }
            }
            self.presenter.on_items_changed(&snapshot, &flags);
            self.presenter.on_auto_fill_status(visible, target);

            if fresh.is_empty() {
                break FillEvent::Stop(StopReason::DuplicatePage);
            }
            page += 1;
        };

        running.armed = false;
        let mut ctx = lock(session);
        if ctx.signature != signature {
            return FillReport {
                state: FillState::Done(StopReason::Superseded),
                started: true,
                pages_fetched,
                merged,
                visible: 0,
            };
        }
        ctx.state = ctx.state.clone().on(event);
        let visible = ctx.listing.visible_count();
        tracing::info!(state = ?ctx.state, pages_fetched, merged, visible, "auto-fill finished");
        FillReport {
            state: ctx.state.clone(),
            started: true,
            pages_fetched,
            merged,
            visible,
        }
    }
}
