use crate::item::ContextKey;
use crate::tags::{sort_tags, tag_key, NormalizedTagSet};
use crate::{Namespace, Store};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Tags the user picked for a context. Matching is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    tags: Vec<String>,
    keys: HashSet<String>,
}

impl FilterSelection {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags = NormalizedTagSet::from_tags(tags).into_vec();
        sort_tags(&mut tags);
        let keys = tags.iter().map(|t| tag_key(t)).collect();
        Self { tags, keys }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.keys.contains(&tag_key(tag))
    }

    pub fn intersects<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().any(|t| self.contains(t.as_ref()))
    }

    fn to_record(&self) -> BTreeMap<&str, bool> {
        self.tags.iter().map(|t| (t.as_str(), true)).collect()
    }
}

/// Persisted selections, one `{tag: true}` record per context.
#[derive(Clone)]
pub struct SelectionStore {
    store: Arc<dyn Store>,
}

impl SelectionStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn load(&self, ctx: &ContextKey) -> anyhow::Result<FilterSelection> {
        let Some(raw) = self.store.get(Namespace::FilterSelection, ctx.as_str())? else {
            return Ok(FilterSelection::default());
        };
        let record: BTreeMap<String, bool> = match serde_json::from_str(&raw) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(context = %ctx, error = %e, "discarding unreadable selection");
                return Ok(FilterSelection::default());
            }
        };
        Ok(FilterSelection::new(
            record.into_iter().filter(|(_, on)| *on).map(|(t, _)| t),
        ))
    }

    pub fn save<I, S>(&self, ctx: &ContextKey, tags: I) -> anyhow::Result<FilterSelection>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sel = FilterSelection::new(tags);
        self.store.set(
            Namespace::FilterSelection,
            ctx.as_str(),
            &serde_json::to_string(&sel.to_record())?,
        )?;
        Ok(sel)
    }

    /// Add `tag` if absent, remove it if present.
    pub fn toggle(&self, ctx: &ContextKey, tag: &str) -> anyhow::Result<FilterSelection> {
        let current = self.load(ctx)?;
        let toggled = NormalizedTagSet::parse(tag);
        let mut next: Vec<String> = current.tags().to_vec();
        for t in toggled.iter() {
            if current.contains(t) {
                next.retain(|x| tag_key(x) != tag_key(t));
            } else {
                next.push(t.to_string());
            }
        }
        self.save(ctx, next)
    }

    pub fn clear(&self, ctx: &ContextKey) -> anyhow::Result<()> {
        self.save(ctx, std::iter::empty::<&str>())?;
        Ok(())
    }
}
