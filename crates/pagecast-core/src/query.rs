//! Module: query
//! Responsibility: the paging surface clients call.
//! Does not own: clamping, loading or timing; it only wires them together.
//!
//! `get_page` is eager. `stream_pages` and `stream_pages_every` return
//! deferred plans that do nothing until pulled or subscribed.

use crate::{
    db::{Page, Paginator, RecordStore},
    error::LoadError,
    stream::{IntervalBatcher, RequestGate},
    traits::Record,
};
use std::{fmt, sync::Arc, time::Duration};

///
/// PageQuery
///

pub struct PageQuery<R: Record> {
    store: Arc<RecordStore<R>>,
}

impl<R: Record> PageQuery<R> {
    #[must_use]
    pub const fn new(store: Arc<RecordStore<R>>) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<RecordStore<R>> {
        &self.store
    }

    /// Load if needed and return the resolved window.
    pub fn get_page(&self, start: usize, end: usize) -> Result<Page<R>, LoadError> {
        self.store.get_page(start, end)
    }

    #[must_use]
    pub fn stream_pages(&self, page_size: usize) -> Paginator<R> {
        Paginator::new(Arc::clone(&self.store), page_size)
    }

    #[must_use]
    pub fn stream_pages_every(&self, page_size: usize, every: Duration) -> IntervalBatcher<R> {
        IntervalBatcher::new(Arc::clone(&self.store), page_size, every)
    }

    /// `get_page` behind a leading-edge throttle.
    #[must_use]
    pub fn coalesce(
        &self,
        min_interval: Duration,
    ) -> RequestGate<(usize, usize), Result<Page<R>, LoadError>> {
        let store = Arc::clone(&self.store);

        RequestGate::new(min_interval, move |(start, end): (usize, usize)| {
            store.get_page(start, end)
        })
    }
}

impl<R: Record> Clone for PageQuery<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: Record> fmt::Debug for PageQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageQuery")
            .field("store", &self.store)
            .finish()
    }
}
