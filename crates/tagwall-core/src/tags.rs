//! Free-text tag normalisation and the per-context learned tag bank.

use crate::{item::ContextKey, Namespace, Store};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Comma, pipe, slash, semicolon, and the decorative bullets/bars some
/// listings use between genres.
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,|/;•·¦∙‧]").expect("separator pattern"));

/// Case-folded comparison key for a canonical tag.
pub fn tag_key(tag: &str) -> String {
    tag.to_lowercase()
}

/// Canonical, deduplicated tag list parsed from raw listing text.
///
/// Deduplication is case-insensitive; the first-seen spelling and position win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTagSet {
    tags: Vec<String>,
}

impl NormalizedTagSet {
    pub fn parse(raw: &str) -> Self {
        let mut set = Self::default();
        let mut seen = HashSet::new();
        set.push_raw(raw, &mut seen);
        set
    }

    /// Normalise already-split tags. Each entry is still run through the
    /// separator split, so a stored `"Action | Comedy"` comes back as two tags.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        let mut seen = HashSet::new();
        for t in tags {
            set.push_raw(t.as_ref(), &mut seen);
        }
        set
    }

    fn push_raw(&mut self, raw: &str, seen: &mut HashSet<String>) {
        let body = strip_brackets(raw.trim());
        for token in SEPARATORS.split(body) {
            let token = token.split_whitespace().collect::<Vec<_>>().join(" ");
            if token.is_empty() {
                continue;
            }
            if seen.insert(tag_key(&token)) {
                self.tags.push(token);
            }
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn into_vec(self) -> Vec<String> {
        self.tags
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        let k = tag_key(tag);
        self.tags.iter().any(|t| tag_key(t) == k)
    }
}

fn strip_brackets(s: &str) -> &str {
    s.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(s)
}

/// Accent- and case-folded key: `Épique` collates next to `epique`.
fn collation_key(tag: &str) -> String {
    tag.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Sort for display: accents and case ignored first, then case-folded
/// spelling, then raw spelling.
pub fn sort_tags(tags: &mut [String]) {
    tags.sort_by_cached_key(|t| (collation_key(t), tag_key(t), t.clone()));
}

/// Append-only bank of every tag seen per context, persisted as
/// `{tag: true}` under the `tag-bank` namespace.
#[derive(Clone)]
pub struct TagLearningStore {
    store: Arc<dyn Store>,
}

impl TagLearningStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn load(&self, ctx: &ContextKey) -> anyhow::Result<BTreeMap<String, bool>> {
        let Some(raw) = self.store.get(Namespace::TagBank, ctx.as_str())? else {
            return Ok(BTreeMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(m) => Ok(m),
            Err(e) => {
                tracing::warn!(context = %ctx, error = %e, "discarding unreadable tag bank");
                Ok(BTreeMap::new())
            }
        }
    }

    /// Merge `tags` into the context's bank. Returns how many were new;
    /// the store is only written when that is non-zero.
    pub fn learn<S: AsRef<str>>(&self, ctx: &ContextKey, tags: &[S]) -> anyhow::Result<usize> {
        let mut bank = self.load(ctx)?;
        let mut known: HashSet<String> = bank.keys().map(|t| tag_key(t)).collect();
        let mut added = 0;
        for tag in NormalizedTagSet::from_tags(tags.iter().map(AsRef::as_ref)).into_vec() {
            if known.insert(tag_key(&tag)) {
                bank.insert(tag, true);
                added += 1;
            }
        }
        if added > 0 {
            self.store
                .set(Namespace::TagBank, ctx.as_str(), &serde_json::to_string(&bank)?)?;
            tracing::debug!(context = %ctx, added, total = bank.len(), "learned tags");
        }
        Ok(added)
    }

    pub fn list(&self, ctx: &ContextKey) -> anyhow::Result<Vec<String>> {
        let mut tags: Vec<String> = self.load(ctx)?.into_keys().collect();
        sort_tags(&mut tags);
        Ok(tags)
    }

    /// Contexts with a non-empty bank.
    pub fn contexts(&self) -> anyhow::Result<Vec<ContextKey>> {
        Ok(self
            .store
            .scan(Namespace::TagBank)?
            .into_iter()
            .map(|(k, _)| ContextKey::new(k))
            .collect())
    }
}
