use serde::{Deserialize, Serialize};

use crate::PagingError;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Tuning for a paged window.
///
/// Missing fields fall back to [`PagingConfig::default`] when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Items requested per prepend/append load.
    pub page_size: usize,
    /// Loaded items to keep ahead of the viewport in each direction.
    pub prefetch_distance: usize,
    pub enable_placeholders: bool,
    /// Items requested by the refresh load.
    pub initial_load_size: usize,
    /// Upper bound on loaded items before distant pages are dropped; `None` is unbounded.
    pub max_size: Option<usize>,
    /// Hints landing this many items outside the window invalidate instead of loading.
    pub jump_threshold: Option<usize>,
}

impl PagingConfig {
    /// Config with the conventional defaults derived from `page_size`.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            prefetch_distance: page_size,
            enable_placeholders: true,
            initial_load_size: page_size * 3,
            max_size: None,
            jump_threshold: None,
        }
    }

    pub fn with_prefetch_distance(mut self, prefetch_distance: usize) -> Self {
        self.prefetch_distance = prefetch_distance;
        self
    }

    pub fn with_placeholders(mut self, enable_placeholders: bool) -> Self {
        self.enable_placeholders = enable_placeholders;
        self
    }

    pub fn with_initial_load_size(mut self, initial_load_size: usize) -> Self {
        self.initial_load_size = initial_load_size;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_jump_threshold(mut self, jump_threshold: usize) -> Self {
        self.jump_threshold = Some(jump_threshold);
        self
    }

    pub fn validate(&self) -> Result<(), PagingError> {
        if self.page_size == 0 {
            return Err(PagingError::InvalidConfig(
                "page_size must be greater than zero".into(),
            ));
        }
        if !self.enable_placeholders && self.prefetch_distance == 0 {
            return Err(PagingError::InvalidConfig(
                "placeholders and prefetch are the only ways to trigger loading; \
                 enable placeholders or set a positive prefetch_distance"
                    .into(),
            ));
        }
        if let Some(max_size) = self.max_size {
            let minimum = self.page_size + 2 * self.prefetch_distance;
            if max_size < minimum {
                return Err(PagingError::InvalidConfig(format!(
                    "max_size {max_size} must be at least page_size + 2 * prefetch_distance ({minimum})"
                )));
            }
        }
        if self.jump_threshold == Some(0) {
            return Err(PagingError::InvalidConfig(
                "jump_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
