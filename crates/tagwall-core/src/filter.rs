use crate::item::Item;
use crate::selection::FilterSelection;

/// Visibility predicate: an item shows when nothing is selected or when any
/// of its tags is selected. Re-run on every selection, item or tag change.
pub struct FilterEngine;

impl FilterEngine {
    pub fn is_visible(item: &Item, selection: &FilterSelection) -> bool {
        selection.is_empty() || selection.intersects(item.tags.as_slice())
    }

    /// One flag per item, in order.
    pub fn flags(items: &[Item], selection: &FilterSelection) -> Vec<bool> {
        items.iter().map(|i| Self::is_visible(i, selection)).collect()
    }

    pub fn apply<'a>(items: &'a [Item], selection: &FilterSelection) -> Vec<&'a Item> {
        items
            .iter()
            .filter(|i| Self::is_visible(i, selection))
            .collect()
    }
}
