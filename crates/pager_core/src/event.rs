use crate::{LoadState, LoadStates, LoadType};

/// A page as it travels through the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformablePage<V> {
    /// Offset of the page relative to the refresh page (prepended pages are negative).
    pub original_page_offset: i32,
    pub data: Vec<V>,
}

impl<V> TransformablePage<V> {
    pub fn new(original_page_offset: i32, data: Vec<V>) -> Self {
        Self {
            original_page_offset,
            data,
        }
    }
}

/// Incremental change to the window, the only way window state leaves the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent<V> {
    Insert {
        load_type: LoadType,
        pages: Vec<TransformablePage<V>>,
        placeholders_before: usize,
        placeholders_after: usize,
        source_states: LoadStates,
        mediator_states: Option<LoadStates>,
    },
    /// Pages with offsets `min_page_offset..=max_page_offset` were removed from
    /// the `load_type` edge.
    Drop {
        load_type: LoadType,
        min_page_offset: i32,
        max_page_offset: i32,
        placeholders_remaining: usize,
    },
    LoadStateUpdate {
        load_type: LoadType,
        from_mediator: bool,
        state: LoadState,
    },
}

impl<V> PageEvent<V> {
    pub fn load_type(&self) -> LoadType {
        match self {
            PageEvent::Insert { load_type, .. }
            | PageEvent::Drop { load_type, .. }
            | PageEvent::LoadStateUpdate { load_type, .. } => *load_type,
        }
    }

    /// Number of pages a `Drop` removes; zero for other events.
    pub fn dropped_page_count(&self) -> usize {
        match self {
            PageEvent::Drop {
                min_page_offset,
                max_page_offset,
                ..
            } => (i64::from(*max_page_offset) - i64::from(*min_page_offset) + 1).max(0) as usize,
            _ => 0,
        }
    }
}
