//! Core runtime for pagecast: memoized record stores, range resolution,
//! pull-based pagination, clock-driven page streams and request coalescing,
//! plus the CSV music catalog they were built for.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod obs;
pub mod query;
pub mod source;
pub mod stream;
pub mod traits;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Page size used when neither the caller nor the config names one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Shortest interval a periodic page stream may tick at, in milliseconds.
///
/// A zero interval would never let the logical clock move past the tick.
pub const MIN_TICK_MS: u64 = 1;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        catalog::{Album, Band, Catalog, Song, TrackLength},
        clock::{LogicalClock, Timestamp},
        db::{Dataset, Page, Paginator, Range, RecordStore},
        query::PageQuery,
        source::DataSource,
        stream::{Emission, IntervalBatcher, PageSource, RequestCoalescer, Subscription},
        traits::{Path, Record},
    };
}
