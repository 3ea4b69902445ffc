//! Module: db::paginator
//! Responsibility: pull-based, self-terminating page sequences.
//! Does not own: timing (see `stream::interval`) or range clamping.

use crate::{
    db::{page::Page, store::RecordStore},
    error::LoadError,
    traits::Record,
};
use std::{iter::FusedIterator, sync::Arc};

///
/// PaginationCursor
///
/// Next-page state for one consumer.
/// Advances exactly one page per step; once exhausted it stays exhausted.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PaginationCursor {
    origin: usize,
    page_index: usize,
    page_size: usize,
    exhausted: bool,
}

impl PaginationCursor {
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self::with_origin(0, page_size)
    }

    /// Cursor whose first page starts at `origin` instead of zero.
    #[must_use]
    pub const fn with_origin(origin: usize, page_size: usize) -> Self {
        Self {
            origin,
            page_index: 0,
            page_size,
            exhausted: false,
        }
    }

    #[must_use]
    pub const fn page_index(&self) -> usize {
        self.page_index
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Offset of the next page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.origin
            .saturating_add(self.page_index.saturating_mul(self.page_size))
    }

    /// Raw `[start, end)` of the next page, with `end` capped at `limit`.
    #[must_use]
    pub fn window(&self, limit: Option<usize>) -> (usize, usize) {
        let start = self.offset();
        let end = start.saturating_add(self.page_size);

        (start, limit.map_or(end, |limit| end.min(limit)))
    }

    pub const fn advance(&mut self) {
        self.page_index = self.page_index.saturating_add(1);
    }

    pub const fn exhaust(&mut self) {
        self.exhausted = true;
    }
}

///
/// Paginator
///
/// Lazy page sequence over a store. Constructing one has no side effects;
/// the store loads on the first pull. Ends (yields `None`) at the first
/// empty page, or after yielding a load failure once.
///
/// The cursor is owned by this value; share pages, not paginators.
/// Restart by building a new paginator.
///

#[derive(Debug)]
pub struct Paginator<R: Record> {
    store: Arc<RecordStore<R>>,
    cursor: PaginationCursor,
}

impl<R: Record> Paginator<R> {
    #[must_use]
    pub const fn new(store: Arc<RecordStore<R>>, page_size: usize) -> Self {
        Self {
            store,
            cursor: PaginationCursor::new(page_size),
        }
    }

    /// Start from a one-based page number; page `0` is treated as page `1`.
    #[must_use]
    pub fn starting_at_page(store: Arc<RecordStore<R>>, page_size: usize, page: usize) -> Self {
        let origin = page.saturating_sub(1).saturating_mul(page_size);

        Self {
            store,
            cursor: PaginationCursor::with_origin(origin, page_size),
        }
    }

    #[must_use]
    pub const fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }
}

impl<R: Record> Iterator for Paginator<R> {
    type Item = Result<Page<R>, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_exhausted() {
            return None;
        }

        let (start, end) = self.cursor.window(None);
        match self.store.get_page(start, end) {
            Err(err) => {
                self.cursor.exhaust();
                Some(Err(err))
            }
            Ok(page) if page.is_empty() => {
                self.cursor.exhaust();
                None
            }
            Ok(page) => {
                self.cursor.advance();
                Some(Ok(page))
            }
        }
    }
}

impl<R: Record> FusedIterator for Paginator<R> {}
