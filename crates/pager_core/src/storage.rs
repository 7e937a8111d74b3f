use std::collections::VecDeque;

use crate::{LoadState, LoadStates, LoadType, PageEvent, TransformablePage, ViewportHint};

/// Flattened, presentable view of a page event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<V> {
    pub items: Vec<V>,
    pub placeholders_before: usize,
    pub placeholders_after: usize,
    pub source_states: LoadStates,
    pub mediator_states: Option<LoadStates>,
}

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            placeholders_before: 0,
            placeholders_after: 0,
            source_states: LoadStates::default(),
            mediator_states: None,
        }
    }
}

/// Deterministic reducer over [`PageEvent`]s.
///
/// Holds the pages the events currently describe, so the same event sequence
/// always folds to the same [`Snapshot`] regardless of how it was scheduled.
#[derive(Debug, Clone)]
pub struct PageEventStorage<V> {
    pages: VecDeque<TransformablePage<V>>,
    placeholders_before: usize,
    placeholders_after: usize,
    source_states: LoadStates,
    mediator_states: Option<LoadStates>,
}

impl<V> Default for PageEventStorage<V> {
    fn default() -> Self {
        Self {
            pages: VecDeque::new(),
            placeholders_before: 0,
            placeholders_after: 0,
            source_states: LoadStates::default(),
            mediator_states: None,
        }
    }
}

impl<V: Clone> PageEventStorage<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = PageEvent<V>>) -> Self {
        let mut storage = Self::new();
        for event in events {
            storage.add(event);
        }
        storage
    }

    pub fn add(&mut self, event: PageEvent<V>) {
        let dropped_pages = event.dropped_page_count();
        match event {
            PageEvent::Insert {
                load_type,
                pages,
                placeholders_before,
                placeholders_after,
                source_states,
                mediator_states,
            } => {
                match load_type {
                    LoadType::Refresh => {
                        self.pages = pages.into();
                        self.placeholders_before = placeholders_before;
                        self.placeholders_after = placeholders_after;
                    }
                    LoadType::Prepend => {
                        for page in pages.into_iter().rev() {
                            self.pages.push_front(page);
                        }
                        self.placeholders_before = placeholders_before;
                    }
                    LoadType::Append => {
                        self.pages.extend(pages);
                        self.placeholders_after = placeholders_after;
                    }
                }
                self.source_states = source_states;
                self.mediator_states = mediator_states;
            }
            PageEvent::Drop {
                load_type,
                placeholders_remaining,
                ..
            } => {
                let count = dropped_pages.min(self.pages.len());
                match load_type {
                    LoadType::Prepend => {
                        self.pages.drain(..count);
                        self.placeholders_before = placeholders_remaining;
                    }
                    LoadType::Append => {
                        self.pages.truncate(self.pages.len() - count);
                        self.placeholders_after = placeholders_remaining;
                    }
                    LoadType::Refresh => {}
                }
            }
            PageEvent::LoadStateUpdate {
                load_type,
                from_mediator,
                state,
            } => {
                if from_mediator {
                    self.mediator_states
                        .get_or_insert_with(LoadStates::default)
                        .set(load_type, state);
                } else {
                    self.source_states.set(load_type, state);
                }
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot<V> {
        Snapshot {
            items: self
                .pages
                .iter()
                .flat_map(|page| page.data.iter().cloned())
                .collect(),
            placeholders_before: self.placeholders_before,
            placeholders_after: self.placeholders_after,
            source_states: self.source_states.clone(),
            mediator_states: self.mediator_states.clone(),
        }
    }

    /// Minimal events that rebuild this storage from scratch.
    ///
    /// With pages held this is a single refresh insert; otherwise only the load
    /// states that moved away from their defaults are replayed.
    pub fn as_events(&self) -> Vec<PageEvent<V>> {
        if !self.pages.is_empty() {
            return vec![PageEvent::Insert {
                load_type: LoadType::Refresh,
                pages: self.pages.iter().cloned().collect(),
                placeholders_before: self.placeholders_before,
                placeholders_after: self.placeholders_after,
                source_states: self.source_states.clone(),
                mediator_states: self.mediator_states.clone(),
            }];
        }

        let source = changed_states(&self.source_states).map(|(load_type, state)| {
            PageEvent::LoadStateUpdate {
                load_type,
                from_mediator: false,
                state,
            }
        });
        let mediator = self.mediator_states.iter().flat_map(|states| {
            changed_states(states).map(|(load_type, state)| PageEvent::LoadStateUpdate {
                load_type,
                from_mediator: true,
                state,
            })
        });
        source.chain(mediator).collect()
    }

    /// Number of presented positions, placeholders included.
    pub fn presented_len(&self) -> usize {
        self.placeholders_before + self.loaded_len() + self.placeholders_after
    }

    pub fn loaded_len(&self) -> usize {
        self.pages.iter().map(|page| page.data.len()).sum()
    }

    /// Hint a consumer should send after accessing presented `position`.
    ///
    /// Positions inside the leading placeholders map to negative indices of the
    /// first page, trailing ones to indices past the end of the last page.
    pub fn hint_for(&self, position: usize) -> Option<ViewportHint> {
        let first = self.pages.front()?;
        if position < self.placeholders_before {
            let index = position as i64 - self.placeholders_before as i64;
            return Some(ViewportHint::new(first.original_page_offset, index as i32));
        }

        let mut index = position - self.placeholders_before;
        for page in &self.pages {
            if index < page.data.len() {
                return Some(ViewportHint::new(page.original_page_offset, index as i32));
            }
            index -= page.data.len();
        }
        let last = self.pages.back()?;
        Some(ViewportHint::new(
            last.original_page_offset,
            (last.data.len() + index) as i32,
        ))
    }
}

fn changed_states(states: &LoadStates) -> impl Iterator<Item = (LoadType, LoadState)> + '_ {
    LoadType::ALL
        .into_iter()
        .map(|load_type| (load_type, states.get(load_type).clone()))
        .filter(|(_, state)| *state != LoadState::INCOMPLETE)
}
