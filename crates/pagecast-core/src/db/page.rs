//! Module: db::page
//! Responsibility: the immutable loaded dataset and the pages cut from it.
//! Does not own: loading (see `db::store`) or cursor progression.

use crate::{
    db::range::{self, Range},
    traits::Record,
};
use derive_more::{Deref, IntoIterator};
use serde::Serialize;
use std::sync::Arc;

///
/// Dataset
///
/// Ordered, zero-indexed records, immutable once loaded.
/// Cloning shares the same allocation.
///

#[derive(Debug, Deref)]
pub struct Dataset<R> {
    records: Arc<[R]>,
}

impl<R> Clone for Dataset<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R> From<Vec<R>> for Dataset<R> {
    fn from(records: Vec<R>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl<R> Dataset<R> {
    /// True when both handles share one loaded allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

impl<R: Record> Dataset<R> {
    /// Resolve a raw window against this dataset.
    #[must_use]
    pub fn resolve(&self, raw_start: usize, raw_end: usize) -> Range {
        range::resolve(raw_start, raw_end, self.records.len())
    }

    /// Copy the records of a raw window into a fresh page.
    #[must_use]
    pub fn page(&self, raw_start: usize, raw_end: usize) -> Page<R> {
        let range = self.resolve(raw_start, raw_end);

        Page::new(range, self.records[range.as_std()].to_vec())
    }
}

///
/// Page
///
/// One resolved window of records. Produced fresh on every request.
/// An empty page is the exhaustion signal, never an error.
///

#[derive(Clone, Debug, Deref, Eq, IntoIterator, PartialEq, Serialize)]
pub struct Page<R> {
    #[into_iterator(owned, ref)]
    #[deref]
    records: Vec<R>,

    range: Range,
}

impl<R> Page<R> {
    #[must_use]
    pub const fn new(range: Range, records: Vec<R>) -> Self {
        Self { records, range }
    }

    /// Empty page positioned at `offset`.
    #[must_use]
    pub const fn empty_at(offset: usize) -> Self {
        Self::new(Range::empty_at(offset), Vec::new())
    }

    #[must_use]
    pub const fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn records(&self) -> &[R] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<R> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::songs;
    use serde_json::json;

    #[test]
    fn page_json_carries_the_resolved_window() {
        let dataset = Dataset::from(songs(76));

        let value = serde_json::to_value(dataset.page(70, 77)).expect("page serializes");

        assert_eq!(value["range"], json!({ "start": 70, "end": 76 }));
        assert_eq!(value["records"].as_array().map(Vec::len), Some(6));
        assert_eq!(value["records"][0]["song_id"], json!(71));
        assert_eq!(value["records"][0]["name"], json!("track-71"));
    }

    #[test]
    fn empty_page_json_is_positioned_at_its_offset() {
        let value = serde_json::to_value(Page::<u32>::empty_at(76)).expect("page serializes");

        assert_eq!(value, json!({ "records": [], "range": { "start": 76, "end": 76 } }));
    }
}
