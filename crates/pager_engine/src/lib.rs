//! Pager engine: async loading driver around the pure window in `pager_core`.
mod mediator;
mod snapshot;
mod source;
mod stream;

pub use mediator::{InitializeAction, MediatorSuccess, RemoteMediator, RemoteMediatorAccessor};
pub use snapshot::PageFetcherSnapshot;
pub use source::{PageKey, PageValue, PagingSource};
pub use stream::PageEventStream;

pub use pager_core::{
    LoadParams, LoadState, LoadStates, LoadType, Page, PageEvent, PageEventStorage, PagingConfig,
    PagingError, PagingState, Snapshot, TransformablePage, ViewportHint,
};
