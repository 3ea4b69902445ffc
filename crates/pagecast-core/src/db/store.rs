//! Module: db::store
//! Responsibility: load a data source once and share the result.
//! Does not own: parsing (see `source`) or pagination policy.
//! Boundary: the only shared mutable state in the engine is the load gate.

use crate::{
    db::page::{Dataset, Page},
    error::LoadError,
    obs::sink::{self, MetricsEvent},
    source::DataSource,
    traits::Record,
};
use std::{
    collections::HashSet,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Mutex, OnceLock},
};
use tracing::{debug, warn};

///
/// RecordStore
///
/// Memoized, single-flight view over one `DataSource`.
///
/// - `new` is a deferred factory: nothing is read until the first `load`.
/// - the source runs at most once per store, including under concurrent
///   callers; callers arriving mid-load block on the in-flight load and get
///   the same shared `Dataset`.
/// - a failed load is cached too and replayed to every caller; retry policy
///   belongs to the caller (build a new store). A panicking source counts as
///   a failed load.
///

pub struct RecordStore<R: Record> {
    source: Box<dyn DataSource<R>>,
    dataset: OnceLock<Result<Dataset<R>, LoadError>>,
}

impl<R: Record> RecordStore<R> {
    #[must_use]
    pub fn new(source: impl DataSource<R> + 'static) -> Self {
        Self {
            source: Box::new(source),
            dataset: OnceLock::new(),
        }
    }

    /// Store over records already in memory.
    #[must_use]
    pub fn from_records(records: Vec<R>) -> Self {
        let records = Mutex::new(Some(records));

        Self::new(move || {
            records
                .lock()
                .expect("record store seed lock poisoned")
                .take()
                .ok_or_else(|| LoadError::source("in-memory records already consumed"))
        })
    }

    /// Return the dataset, loading it on first use.
    pub fn load(&self) -> Result<Dataset<R>, LoadError> {
        self.dataset.get_or_init(|| self.load_once()).clone()
    }

    /// Whether the one-time load has resolved (successfully or not).
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }

    /// Number of records, loading on first use.
    pub fn len(&self) -> Result<usize, LoadError> {
        self.load().map(|dataset| dataset.len())
    }

    /// Resolve a raw window and copy it into a fresh page.
    pub fn get_page(&self, start: usize, end: usize) -> Result<Page<R>, LoadError> {
        let dataset = self.load()?;
        let page = dataset.page(start, end);

        sink::record(MetricsEvent::PageServed {
            path: R::PATH,
            records: page.len() as u64,
        });

        Ok(page)
    }

    fn load_once(&self) -> Result<Dataset<R>, LoadError> {
        debug!(source = %self.source.describe(), "loading dataset");

        // A panicking source still resolves the gate, so it is never re-run.
        let loaded = catch_unwind(AssertUnwindSafe(|| self.source.load()))
            .unwrap_or_else(|_| Err(LoadError::source("data source panicked")));

        let result = loaded.and_then(|records| {
            ensure_unique_ids(&records)?;

            Ok(Dataset::from(records))
        });

        match &result {
            Ok(dataset) => {
                debug!(path = R::PATH, records = dataset.len(), "dataset loaded");
                sink::record(MetricsEvent::StoreLoad {
                    path: R::PATH,
                    records: dataset.len() as u64,
                    ok: true,
                });
            }
            Err(err) => {
                warn!(path = R::PATH, error = %err, "dataset load failed; caching failure");
                sink::record(MetricsEvent::StoreLoad {
                    path: R::PATH,
                    records: 0,
                    ok: false,
                });
            }
        }

        result
    }
}

impl<R: Record> fmt::Debug for RecordStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &R::PATH)
            .field("source", &self.source.describe())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn ensure_unique_ids<R: Record>(records: &[R]) -> Result<(), LoadError> {
    let mut seen = HashSet::with_capacity(records.len());

    for record in records {
        let id = record.id();
        if !seen.insert(id) {
            return Err(LoadError::DuplicateId {
                path: R::PATH,
                id: id.to_string(),
            });
        }
    }

    Ok(())
}
