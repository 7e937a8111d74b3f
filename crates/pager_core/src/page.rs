use std::sync::Arc;

use crate::{LoadType, PagingConfig};

/// One page returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<K, V> {
    pub data: Vec<V>,
    /// Key to load the page before this one; `None` when nothing precedes it.
    pub prev_key: Option<K>,
    /// Key to load the page after this one; `None` when nothing follows it.
    pub next_key: Option<K>,
    /// Items known to exist before this page, when the source can count them.
    pub items_before: Option<usize>,
    /// Items known to exist after this page, when the source can count them.
    pub items_after: Option<usize>,
}

impl<K, V> Page<K, V> {
    pub fn new(data: Vec<V>, prev_key: Option<K>, next_key: Option<K>) -> Self {
        Self {
            data,
            prev_key,
            next_key,
            items_before: None,
            items_after: None,
        }
    }

    pub fn with_counts(mut self, items_before: usize, items_after: usize) -> Self {
        self.items_before = Some(items_before);
        self.items_after = Some(items_after);
        self
    }

    /// Zero-item page with no continuation keys.
    pub fn empty() -> Self {
        Self::new(Vec::new(), None, None)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadParams<K> {
    pub load_type: LoadType,
    pub key: Option<K>,
    pub load_size: usize,
    pub placeholders_enabled: bool,
    pub page_size: usize,
}

impl<K> LoadParams<K> {
    pub fn new(load_type: LoadType, key: Option<K>, config: &PagingConfig) -> Self {
        let load_size = match load_type {
            LoadType::Refresh => config.initial_load_size,
            LoadType::Prepend | LoadType::Append => config.page_size,
        };
        Self {
            load_type,
            key,
            load_size,
            placeholders_enabled: config.enable_placeholders,
            page_size: config.page_size,
        }
    }
}

/// Point-in-time view of the loaded window, handed to the mediator and used
/// to pick a refresh key for the next generation.
#[derive(Debug, Clone)]
pub struct PagingState<K, V> {
    pub pages: Vec<Arc<Page<K, V>>>,
    /// Absolute position (placeholders included) of the last accessed item.
    pub anchor_position: Option<usize>,
    pub config: PagingConfig,
    pub placeholders_before: usize,
}

impl<K, V> PagingState<K, V> {
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|page| page.is_empty())
    }

    pub fn first_item(&self) -> Option<&V> {
        self.pages.iter().find_map(|page| page.data.first())
    }

    pub fn last_item(&self) -> Option<&V> {
        self.pages.iter().rev().find_map(|page| page.data.last())
    }

    /// The loaded item closest to `position`, clamping into the loaded range.
    pub fn closest_item_to_position(&self, position: usize) -> Option<&V> {
        if self.is_empty() {
            return None;
        }
        let mut index = position.saturating_sub(self.placeholders_before);
        for page in &self.pages {
            if index < page.len() {
                return page.data.get(index);
            }
            index -= page.len();
        }
        self.last_item()
    }

    /// The page containing `position`, clamping into the loaded range.
    pub fn closest_page_to_position(&self, position: usize) -> Option<&Arc<Page<K, V>>> {
        if self.is_empty() {
            return None;
        }
        let mut index = position.saturating_sub(self.placeholders_before);
        for page in &self.pages {
            if index < page.len() {
                return Some(page);
            }
            index -= page.len();
        }
        self.pages.iter().rev().find(|page| !page.is_empty())
    }
}
