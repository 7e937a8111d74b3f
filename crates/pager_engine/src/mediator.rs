use std::sync::Arc;

use pager_core::{LoadType, PagingError, PagingState};
use pager_logging::{pager_debug, pager_warn};

use crate::{PageKey, PageValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediatorSuccess {
    pub end_of_pagination_reached: bool,
}

/// What the mediator wants to happen when a new snapshot starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializeAction {
    /// Run a remote refresh before the first local load.
    LaunchInitialRefresh,
    SkipInitialRefresh,
}

/// Pulls more data into the source of truth when the window reaches an edge.
#[async_trait::async_trait]
pub trait RemoteMediator<K: PageKey, V: PageValue>: Send + Sync {
    async fn load(
        &self,
        load_type: LoadType,
        state: PagingState<K, V>,
    ) -> Result<MediatorSuccess, PagingError>;

    async fn initialize(&self) -> InitializeAction {
        InitializeAction::LaunchInitialRefresh
    }
}

/// Shared handle the engine uses to reach a [`RemoteMediator`].
pub struct RemoteMediatorAccessor<K: PageKey, V: PageValue> {
    mediator: Arc<dyn RemoteMediator<K, V>>,
}

impl<K: PageKey, V: PageValue> Clone for RemoteMediatorAccessor<K, V> {
    fn clone(&self) -> Self {
        Self {
            mediator: self.mediator.clone(),
        }
    }
}

impl<K: PageKey, V: PageValue> RemoteMediatorAccessor<K, V> {
    pub fn new(mediator: Arc<dyn RemoteMediator<K, V>>) -> Self {
        Self { mediator }
    }

    /// Asks the mediator whether a snapshot should start with a remote refresh.
    pub async fn initialize(&self) -> InitializeAction {
        let action = self.mediator.initialize().await;
        pager_debug!("remote mediator initialized: {:?}", action);
        action
    }

    pub async fn load(
        &self,
        load_type: LoadType,
        state: PagingState<K, V>,
    ) -> Result<MediatorSuccess, PagingError> {
        pager_debug!(
            "remote {} boundary call (anchor {:?})",
            load_type,
            state.anchor_position
        );
        let result = self.mediator.load(load_type, state).await;
        if let Err(err) = &result {
            pager_warn!("remote {} boundary call failed: {}", load_type, err);
        }
        result
    }
}
