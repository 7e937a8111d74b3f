//! Pager core: the loaded window, its load states and the page event model.
//!
//! Everything here is synchronous and deterministic. The async driver lives in
//! `pager_engine` and serializes all access to [`WindowState`].
mod config;
mod error;
mod event;
mod hint;
mod load_state;
mod page;
mod storage;
mod window;

pub use config::{PagingConfig, DEFAULT_PAGE_SIZE};
pub use error::PagingError;
pub use event::{PageEvent, TransformablePage};
pub use hint::{GenerationalViewportHint, ViewportHint};
pub use load_state::{LoadState, LoadStateTable, LoadStates, LoadType};
pub use page::{LoadParams, Page, PagingState};
pub use storage::{PageEventStorage, Snapshot};
pub use window::{DropInfo, WindowState};
