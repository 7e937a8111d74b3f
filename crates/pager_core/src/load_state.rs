use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PagingError;

/// Direction of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadType {
    /// Reload from scratch with the initial key.
    Refresh,
    /// Extend toward earlier keys.
    Prepend,
    /// Extend toward later keys.
    Append,
}

impl LoadType {
    pub const ALL: [LoadType; 3] = [LoadType::Refresh, LoadType::Prepend, LoadType::Append];

    /// The edge evicted when loading in this direction.
    pub fn opposite(self) -> Self {
        match self {
            LoadType::Prepend => LoadType::Append,
            LoadType::Append | LoadType::Refresh => LoadType::Prepend,
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadType::Refresh => write!(f, "refresh"),
            LoadType::Prepend => write!(f, "prepend"),
            LoadType::Append => write!(f, "append"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    NotLoading { end_of_pagination_reached: bool },
    Error(PagingError),
}

impl LoadState {
    pub const INCOMPLETE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: false,
    };
    pub const COMPLETE: LoadState = LoadState::NotLoading {
        end_of_pagination_reached: true,
    };

    pub fn not_loading(end_of_pagination_reached: bool) -> Self {
        LoadState::NotLoading {
            end_of_pagination_reached,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadState::Error(_))
    }

    pub fn is_complete(&self) -> bool {
        *self == LoadState::COMPLETE
    }
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::INCOMPLETE
    }
}

/// Load states of one origin, one cell per direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadStates {
    pub refresh: LoadState,
    pub prepend: LoadState,
    pub append: LoadState,
}

impl LoadStates {
    pub fn get(&self, load_type: LoadType) -> &LoadState {
        match load_type {
            LoadType::Refresh => &self.refresh,
            LoadType::Prepend => &self.prepend,
            LoadType::Append => &self.append,
        }
    }

    /// Stores `state`, returning whether the cell changed.
    pub fn set(&mut self, load_type: LoadType, state: LoadState) -> bool {
        let cell = match load_type {
            LoadType::Refresh => &mut self.refresh,
            LoadType::Prepend => &mut self.prepend,
            LoadType::Append => &mut self.append,
        };
        if *cell == state {
            return false;
        }
        *cell = state;
        true
    }
}

/// Local and (optional) remote load states tracked by the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStateTable {
    source: LoadStates,
    mediator: Option<LoadStates>,
}

impl LoadStateTable {
    pub fn new(has_remote_state: bool) -> Self {
        Self {
            source: LoadStates::default(),
            mediator: has_remote_state.then(LoadStates::default),
        }
    }

    pub fn get(&self, load_type: LoadType, from_mediator: bool) -> &LoadState {
        match (from_mediator, &self.mediator) {
            (true, Some(mediator)) => mediator.get(load_type),
            _ => self.source.get(load_type),
        }
    }

    /// Returns whether the state changed. Remote writes are ignored without a mediator.
    pub fn set(&mut self, load_type: LoadType, from_mediator: bool, state: LoadState) -> bool {
        if !from_mediator {
            return self.source.set(load_type, state);
        }
        match self.mediator.as_mut() {
            Some(mediator) => mediator.set(load_type, state),
            None => false,
        }
    }

    pub fn source(&self) -> &LoadStates {
        &self.source
    }

    pub fn mediator(&self) -> Option<&LoadStates> {
        self.mediator.as_ref()
    }

    /// Every `(load_type, from_mediator)` cell currently in error, local cells first.
    pub fn errors(&self) -> Vec<(LoadType, bool)> {
        let local = LoadType::ALL
            .into_iter()
            .filter(|load_type| self.source.get(*load_type).is_error())
            .map(|load_type| (load_type, false));
        let remote = self.mediator.iter().flat_map(|mediator| {
            LoadType::ALL
                .into_iter()
                .filter(|load_type| mediator.get(*load_type).is_error())
                .map(|load_type| (load_type, true))
        });
        local.chain(remote).collect()
    }
}
