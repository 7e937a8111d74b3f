use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures_util::Stream;
use pager_core::{PageEvent, PagingError};
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// Ordered page events of one snapshot.
///
/// Ends when the snapshot is closed, invalidated or stopped by a fatal error.
/// Dropping the stream closes the snapshot.
pub struct PageEventStream<V> {
    events: mpsc::Receiver<PageEvent<V>>,
    fatal: Arc<Mutex<Option<PagingError>>>,
    _close_on_drop: DropGuard,
}

impl<V> PageEventStream<V> {
    pub(crate) fn new(
        events: mpsc::Receiver<PageEvent<V>>,
        fatal: Arc<Mutex<Option<PagingError>>>,
        close_on_drop: DropGuard,
    ) -> Self {
        Self {
            events,
            fatal,
            _close_on_drop: close_on_drop,
        }
    }

    /// The usage error or invariant violation that stopped the snapshot, if any.
    pub fn fatal_error(&self) -> Option<PagingError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<V> Stream for PageEventStream<V> {
    type Item = PageEvent<V>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}
