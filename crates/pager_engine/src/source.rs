use std::fmt::Debug;

use pager_core::{LoadParams, Page, PagingError, PagingState};

/// Bounds a continuation key must meet to travel through the engine.
pub trait PageKey: Clone + Debug + PartialEq + Send + Sync + 'static {}

impl<T> PageKey for T where T: Clone + Debug + PartialEq + Send + Sync + 'static {}

/// Bounds an item must meet to travel through the engine.
pub trait PageValue: Clone + Send + Sync + 'static {}

impl<T> PageValue for T where T: Clone + Send + Sync + 'static {}

/// The paginated data the window is assembled from.
///
/// A key handed back in `prev_key`/`next_key` must make forward progress when
/// loaded, unless [`PagingSource::key_reuse_supported`] says otherwise.
#[async_trait::async_trait]
pub trait PagingSource<K: PageKey, V: PageValue>: Send + Sync {
    async fn load(&self, params: LoadParams<K>) -> Result<Page<K, V>, PagingError>;

    fn key_reuse_supported(&self) -> bool {
        false
    }

    /// Whether the source can restart from an arbitrary key after a jump.
    fn jumping_supported(&self) -> bool {
        false
    }

    /// Initial key for the next generation, derived from the current window.
    fn refresh_key(&self, _state: &PagingState<K, V>) -> Option<K> {
        None
    }
}
