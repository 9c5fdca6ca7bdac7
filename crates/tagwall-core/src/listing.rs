use crate::filter::FilterEngine;
use crate::item::Item;
use crate::selection::FilterSelection;
use std::collections::HashMap;

/// Append-only arena of merged items with an identity index. Items are never
/// removed; filtering only flips their visibility flag.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    items: Vec<Item>,
    index: HashMap<String, usize>,
    visible: Vec<bool>,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless its id is already present. New items start visible
    /// until the next `refilter`.
    pub fn merge(&mut self, item: Item) -> bool {
        if self.index.contains_key(&item.id) {
            return false;
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        self.visible.push(true);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn refilter(&mut self, selection: &FilterSelection) -> usize {
        self.visible = FilterEngine::flags(&self.items, selection);
        self.visible_count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn flags(&self) -> &[bool] {
        &self.visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }

    pub fn visible_items(&self) -> Vec<Item> {
        self.items
            .iter()
            .zip(&self.visible)
            .filter(|(_, v)| **v)
            .map(|(i, _)| i.clone())
            .collect()
    }
}
