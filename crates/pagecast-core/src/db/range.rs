//! Module: db::range
//! Responsibility: clamp raw `[start, end)` windows against a dataset size.
//! Does not own: dataset access or page materialization.

use serde::Serialize;

///
/// Range
///
/// Half-open window into a dataset.
/// Values returned by [`resolve`] always satisfy `start <= end <= size`.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    #[must_use]
    pub const fn empty_at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[must_use]
    pub const fn as_std(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Resolve a raw window against `size`.
///
/// The end is clamped to `size` first and the start is clamped to that end,
/// so a start at or past the end of the data yields an empty range instead
/// of an out-of-bounds failure. Total; never fails.
#[must_use]
pub const fn resolve(raw_start: usize, raw_end: usize, size: usize) -> Range {
    let end = if raw_end < size { raw_end } else { size };
    let start = if raw_start < end { raw_start } else { end };

    if start == end {
        return Range::empty_at(start);
    }

    Range { start, end }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn start_past_size_resolves_empty_at_size() {
        assert_eq!(resolve(80, 90, 76), Range::empty_at(76));
    }

    #[test]
    fn end_past_size_is_clamped() {
        let range = resolve(70, 77, 76);

        assert_eq!(range, Range { start: 70, end: 76 });
        assert_eq!(range.len(), 6);
    }

    #[test]
    fn inverted_window_collapses_onto_clamped_end() {
        assert_eq!(resolve(8, 3, 76), Range::empty_at(3));
    }

    #[test]
    fn empty_dataset_always_resolves_to_origin() {
        assert_eq!(resolve(0, 10, 0), Range::empty_at(0));
        assert_eq!(resolve(5, 10, 0), Range::empty_at(0));
    }

    proptest! {
        #[test]
        fn resolved_range_is_within_bounds(
            start in 0usize..200,
            end in 0usize..200,
            size in 0usize..150,
        ) {
            let range = resolve(start, end, size);

            prop_assert!(range.start <= range.end);
            prop_assert!(range.end <= size);
        }

        #[test]
        fn resolve_is_idempotent(
            start in 0usize..200,
            end in 0usize..200,
            size in 0usize..150,
        ) {
            let once = resolve(start, end, size);
            let twice = resolve(once.start, once.end, size);

            prop_assert_eq!(once, twice);
        }

        #[test]
        fn in_bounds_window_is_untouched(
            size in 1usize..150,
            a in 0usize..150,
            b in 0usize..150,
        ) {
            let (start, end) = (a.min(b) % size, a.max(b) % size);
            prop_assume!(start < end);

            prop_assert_eq!(resolve(start, end, size), Range { start, end });
        }
    }
}
