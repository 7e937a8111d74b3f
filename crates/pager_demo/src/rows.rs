use std::time::Duration;

use pager_engine::{LoadParams, Page, PagingError, PagingSource, PagingState};

/// In-memory table of `total` numbered rows, keyed by row index.
pub struct RowSource {
    total: usize,
    latency: Duration,
}

impl RowSource {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            latency: Duration::from_millis(5),
        }
    }
}

#[async_trait::async_trait]
impl PagingSource<usize, String> for RowSource {
    async fn load(&self, params: LoadParams<usize>) -> Result<Page<usize, String>, PagingError> {
        tokio::time::sleep(self.latency).await;

        let start = params.key.unwrap_or(0).min(self.total);
        let end = (start + params.load_size).min(self.total);
        let rows = (start..end).map(|index| format!("row {index}")).collect();
        let prev_key = (start > 0).then(|| start.saturating_sub(params.page_size));
        let next_key = (end < self.total).then_some(end);
        Ok(Page::new(rows, prev_key, next_key).with_counts(start, self.total - end))
    }

    /// Resumes at the first row of the page the consumer was looking at.
    fn refresh_key(&self, state: &PagingState<usize, String>) -> Option<usize> {
        let anchor = state.anchor_position?;
        state.closest_page_to_position(anchor)?.items_before
    }
}
