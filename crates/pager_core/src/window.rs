use std::collections::VecDeque;
use std::sync::Arc;

use crate::{
    LoadState, LoadStateTable, LoadType, Page, PageEvent, PagingConfig, PagingError, PagingState,
    TransformablePage, ViewportHint,
};

/// Eviction plan computed by [`WindowState::drop_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropInfo {
    pub page_count: usize,
    pub placeholders_remaining: usize,
}

/// A hint resolved against the pages currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CoercedHint {
    page_index: usize,
    index_in_page: i64,
    /// Signed distance, in items, from the hint to the nearest loaded item.
    hint_offset: i64,
}

/// The loaded window: a contiguous run of pages plus everything needed to
/// decide what to load or drop next.
///
/// Prepend and append each carry a generation counter. A drop at an edge bumps
/// that edge's generation, so results of loads issued before the drop are
/// rejected by [`WindowState::insert`].
#[derive(Debug)]
pub struct WindowState<K, V> {
    config: PagingConfig,
    pages: VecDeque<Arc<Page<K, V>>>,
    /// Index in `pages` of the page returned by refresh; negative once it was dropped.
    initial_page_index: i32,
    placeholders_before: usize,
    placeholders_after: usize,
    prepend_generation: u32,
    append_generation: u32,
    failed_prepend_hint: Option<ViewportHint>,
    failed_append_hint: Option<ViewportHint>,
    load_states: LoadStateTable,
}

impl<K, V> WindowState<K, V> {
    pub fn new(config: PagingConfig, has_remote_state: bool) -> Self {
        Self {
            config,
            pages: VecDeque::new(),
            initial_page_index: 0,
            placeholders_before: 0,
            placeholders_after: 0,
            prepend_generation: 0,
            append_generation: 0,
            failed_prepend_hint: None,
            failed_append_hint: None,
            load_states: LoadStateTable::new(has_remote_state),
        }
    }

    pub fn config(&self) -> &PagingConfig {
        &self.config
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page<K, V>> {
        self.pages.iter().map(|page| page.as_ref())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of loaded items across all pages.
    pub fn storage_count(&self) -> usize {
        self.pages.iter().map(|page| page.len()).sum()
    }

    pub fn placeholders_before(&self) -> usize {
        if self.config.enable_placeholders {
            self.placeholders_before
        } else {
            0
        }
    }

    pub fn placeholders_after(&self) -> usize {
        if self.config.enable_placeholders {
            self.placeholders_after
        } else {
            0
        }
    }

    /// Live generation of an edge. Refresh is not generational and always reports 0.
    pub fn generation(&self, load_type: LoadType) -> u32 {
        match load_type {
            LoadType::Refresh => 0,
            LoadType::Prepend => self.prepend_generation,
            LoadType::Append => self.append_generation,
        }
    }

    pub fn load_states(&self) -> &LoadStateTable {
        &self.load_states
    }

    pub fn load_states_mut(&mut self) -> &mut LoadStateTable {
        &mut self.load_states
    }

    pub fn failed_hint(&self, load_type: LoadType) -> Option<ViewportHint> {
        match load_type {
            LoadType::Refresh => None,
            LoadType::Prepend => self.failed_prepend_hint,
            LoadType::Append => self.failed_append_hint,
        }
    }

    /// Remembers the hint of a failed edge load so a retry can resume from it.
    pub fn stash_failed_hint(&mut self, load_type: LoadType, hint: ViewportHint) {
        match load_type {
            LoadType::Refresh => {}
            LoadType::Prepend => self.failed_prepend_hint = Some(hint.for_retry()),
            LoadType::Append => self.failed_append_hint = Some(hint.for_retry()),
        }
    }

    fn clear_failed_hint(&mut self, load_type: LoadType) {
        match load_type {
            LoadType::Refresh => {
                self.failed_prepend_hint = None;
                self.failed_append_hint = None;
            }
            LoadType::Prepend => self.failed_prepend_hint = None,
            LoadType::Append => self.failed_append_hint = None,
        }
    }

    /// Applies a loaded page. Returns `Ok(false)` without touching anything when
    /// `load_id` is not the live generation of the edge.
    pub fn insert(
        &mut self,
        load_id: u32,
        load_type: LoadType,
        page: Page<K, V>,
    ) -> Result<bool, PagingError> {
        match load_type {
            LoadType::Refresh => {
                if !self.pages.is_empty() {
                    // Loads issued against the replaced window must not land in the new one.
                    self.prepend_generation += 1;
                    self.append_generation += 1;
                }
                self.placeholders_before = page.items_before.unwrap_or(0);
                self.placeholders_after = page.items_after.unwrap_or(0);
                self.pages.clear();
                self.pages.push_back(Arc::new(page));
                self.initial_page_index = 0;
                self.clear_failed_hint(LoadType::Refresh);
            }
            LoadType::Prepend => {
                if self.pages.is_empty() {
                    return Err(PagingError::invariant("prepend received before refresh"));
                }
                if load_id != self.prepend_generation {
                    return Ok(false);
                }
                self.placeholders_before = match page.items_before {
                    Some(count) => count,
                    None => self.placeholders_before.saturating_sub(page.len()),
                };
                self.pages.push_front(Arc::new(page));
                self.initial_page_index += 1;
                self.clear_failed_hint(LoadType::Prepend);
            }
            LoadType::Append => {
                if self.pages.is_empty() {
                    return Err(PagingError::invariant("append received before refresh"));
                }
                if load_id != self.append_generation {
                    return Ok(false);
                }
                self.placeholders_after = match page.items_after {
                    Some(count) => count,
                    None => self.placeholders_after.saturating_sub(page.len()),
                };
                self.pages.push_back(Arc::new(page));
                self.clear_failed_hint(LoadType::Append);
            }
        }
        Ok(true)
    }

    /// Insert event for the page that sits at the `load_type` edge.
    pub fn page_event(&self, load_type: LoadType) -> Result<PageEvent<V>, PagingError>
    where
        V: Clone,
    {
        let (index, page) = match load_type {
            LoadType::Refresh | LoadType::Prepend => (0, self.pages.front()),
            LoadType::Append => (self.pages.len().saturating_sub(1), self.pages.back()),
        };
        let page = page.ok_or_else(|| {
            PagingError::invariant(format!("no page to emit for {load_type} insert"))
        })?;
        Ok(PageEvent::Insert {
            load_type,
            pages: vec![TransformablePage::new(
                self.page_offset(index),
                page.data.clone(),
            )],
            placeholders_before: self.placeholders_before(),
            placeholders_after: self.placeholders_after(),
            source_states: self.load_states.source().clone(),
            mediator_states: self.load_states.mediator().cloned(),
        })
    }

    /// How many pages to evict from the `load_type` edge, if any.
    ///
    /// Only kicks in above `config.max_size` loaded items, and keeps at least
    /// `prefetch_distance` items between the viewport and the dropped edge.
    pub fn drop_info(&self, load_type: LoadType, hint: &ViewportHint) -> Option<DropInfo> {
        let max_size = self.config.max_size?;
        if load_type == LoadType::Refresh {
            return None;
        }
        let storage_count = self.storage_count();
        if storage_count <= max_size {
            return None;
        }
        let coerced = self.coerce(hint)?;
        let items_on_side = match load_type {
            LoadType::Prepend => self.items_before_page(coerced.page_index) + coerced.index_in_page,
            _ => self.items_from_page(coerced.page_index) - coerced.index_in_page - 1,
        };

        let mut pages_to_drop = 0;
        let mut items_to_drop = 0;
        while pages_to_drop < self.pages.len() && storage_count - items_to_drop > max_size {
            let page_size = match load_type {
                LoadType::Prepend => self.pages[pages_to_drop].len(),
                _ => self.pages[self.pages.len() - 1 - pages_to_drop].len(),
            };
            let items_left = items_on_side - (items_to_drop + page_size) as i64;
            if items_left < self.config.prefetch_distance as i64 {
                break;
            }
            items_to_drop += page_size;
            pages_to_drop += 1;
        }

        if pages_to_drop == 0 {
            return None;
        }
        let edge_placeholders = match load_type {
            LoadType::Prepend => self.placeholders_before(),
            _ => self.placeholders_after(),
        };
        Some(DropInfo {
            page_count: pages_to_drop,
            placeholders_remaining: if self.config.enable_placeholders {
                edge_placeholders + items_to_drop
            } else {
                0
            },
        })
    }

    /// Removes `page_count` pages from the `load_type` edge and returns the
    /// matching `Drop` event.
    ///
    /// The edge goes back to not-loading/incomplete and its generation moves on.
    pub fn drop_pages(
        &mut self,
        load_type: LoadType,
        page_count: usize,
        placeholders_remaining: usize,
    ) -> Result<PageEvent<V>, PagingError> {
        if load_type == LoadType::Refresh {
            return Err(PagingError::invariant("cannot drop refresh"));
        }
        if page_count == 0 || page_count > self.pages.len() {
            return Err(PagingError::invariant(format!(
                "cannot drop {page_count} of {} pages",
                self.pages.len()
            )));
        }

        let (min_page_offset, max_page_offset) = match load_type {
            LoadType::Prepend => {
                let min = self.page_offset(0);
                (min, min + page_count as i32 - 1)
            }
            _ => {
                let max = self.page_offset(self.pages.len() - 1);
                (max - page_count as i32 + 1, max)
            }
        };

        match load_type {
            LoadType::Prepend => {
                self.pages.drain(..page_count);
                self.initial_page_index -= page_count as i32;
                self.placeholders_before = placeholders_remaining;
                self.prepend_generation += 1;
            }
            _ => {
                self.pages.truncate(self.pages.len() - page_count);
                self.placeholders_after = placeholders_remaining;
                self.append_generation += 1;
            }
        }
        self.clear_failed_hint(load_type);
        self.load_states.set(load_type, false, LoadState::INCOMPLETE);

        Ok(PageEvent::Drop {
            load_type,
            min_page_offset,
            max_page_offset,
            placeholders_remaining: self.placeholders_after_drop(load_type),
        })
    }

    fn placeholders_after_drop(&self, load_type: LoadType) -> usize {
        match load_type {
            LoadType::Prepend => self.placeholders_before(),
            _ => self.placeholders_after(),
        }
    }

    /// Continuation key for the next `load_type` page, or `None` when the edge
    /// should stop loading for this hint.
    ///
    /// Stops on a stale `generation`, on an errored edge unless the hint is a
    /// retry, and once `prefetch_distance` items are loaded past the viewport.
    pub fn next_load_key(
        &self,
        load_type: LoadType,
        generation: u32,
        hint: &ViewportHint,
    ) -> Option<K>
    where
        K: Clone,
    {
        if load_type == LoadType::Refresh || generation != self.generation(load_type) {
            return None;
        }
        if self.load_states.get(load_type, false).is_error() && !hint.from_retry {
            return None;
        }
        let coerced = self.coerce(hint)?;
        let prefetch_distance = self.config.prefetch_distance as i64 + coerced.hint_offset.abs();

        match load_type {
            LoadType::Prepend => {
                let items_before = self.items_before_page(coerced.page_index) + coerced.index_in_page;
                if items_before < prefetch_distance {
                    self.pages.front().and_then(|page| page.prev_key.clone())
                } else {
                    None
                }
            }
            _ => {
                let items_including_page = self.items_from_page(coerced.page_index);
                if coerced.index_in_page + 1 + prefetch_distance > items_including_page {
                    self.pages.back().and_then(|page| page.next_key.clone())
                } else {
                    None
                }
            }
        }
    }

    /// Signed distance in items between `hint` and the loaded window; 0 inside it.
    pub fn hint_offset(&self, hint: &ViewportHint) -> Option<i64> {
        self.coerce(hint).map(|coerced| coerced.hint_offset)
    }

    pub fn current_paging_state(&self, hint: Option<&ViewportHint>) -> PagingState<K, V> {
        let anchor_position = hint.and_then(|hint| self.coerce(hint)).map(|coerced| {
            let index = self.items_before_page(coerced.page_index)
                + coerced.index_in_page
                + self.placeholders_before() as i64;
            index.max(0) as usize
        });

        PagingState {
            pages: self.pages.iter().cloned().collect(),
            anchor_position,
            config: self.config,
            placeholders_before: self.placeholders_before(),
        }
    }

    fn page_offset(&self, index: usize) -> i32 {
        index as i32 - self.initial_page_index
    }

    fn items_before_page(&self, page_index: usize) -> i64 {
        self.pages
            .iter()
            .take(page_index)
            .map(|page| page.len() as i64)
            .sum()
    }

    fn items_from_page(&self, page_index: usize) -> i64 {
        self.pages
            .iter()
            .skip(page_index)
            .map(|page| page.len() as i64)
            .sum()
    }

    fn coerce(&self, hint: &ViewportHint) -> Option<CoercedHint> {
        let last = self.pages.back()?;
        let last_index = self.pages.len() as i64 - 1;
        let page_size = self.config.page_size as i64;
        let page_index = i64::from(hint.page_offset) + i64::from(self.initial_page_index);
        let index_in_page = i64::from(hint.index_in_page);

        let coerced = if page_index < 0 {
            CoercedHint {
                page_index: 0,
                index_in_page: 0,
                hint_offset: page_index * page_size + index_in_page,
            }
        } else if page_index > last_index {
            CoercedHint {
                page_index: last_index as usize,
                index_in_page: (last.len() as i64 - 1).max(0),
                hint_offset: (page_index - last_index - 1) * page_size + index_in_page + 1,
            }
        } else {
            let page_len = self.pages[page_index as usize].len() as i64;
            let clamped = index_in_page.clamp(0, (page_len - 1).max(0));
            CoercedHint {
                page_index: page_index as usize,
                index_in_page: clamped,
                hint_offset: index_in_page - clamped,
            }
        };
        Some(coerced)
    }
}
