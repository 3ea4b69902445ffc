use crate::{
    catalog::{Song, TrackLength},
    db::RecordStore,
    error::LoadError,
    source::DataSource,
    traits::Record,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

/// Size of the catalog the fixture CSVs describe.
pub(crate) const TOTAL_SONGS: usize = 76;

/// Synthesize `count` songs with ids `1..=count`, spread over seven bands.
pub(crate) fn songs(count: usize) -> Vec<Song> {
    (1..=count)
        .map(|n| {
            let id = u32::try_from(n).expect("fixture size fits u32");

            Song {
                song_id: id,
                name: format!("track-{id:02}"),
                length: TrackLength::from_secs(180 + id),
                band_id: id % 7 + 1,
                album_id: id % 7 + 1,
            }
        })
        .collect()
}

/// In-memory song store of `count` records.
pub(crate) fn song_store(count: usize) -> Arc<RecordStore<Song>> {
    Arc::new(RecordStore::from_records(songs(count)))
}

///
/// CountingSource
///
/// Test source that counts invocations, optionally stalls, and can fail.
///

pub(crate) struct CountingSource<R> {
    records: Vec<R>,
    calls: Arc<AtomicUsize>,
    stall: Duration,
    fail_with: Option<LoadError>,
}

impl<R: Record> CountingSource<R> {
    pub(crate) fn new(records: Vec<R>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            records,
            calls: Arc::clone(&calls),
            stall: Duration::ZERO,
            fail_with: None,
        };

        (source, calls)
    }

    pub(crate) fn stalling(mut self, stall: Duration) -> Self {
        self.stall = stall;
        self
    }

    pub(crate) fn failing(mut self, err: LoadError) -> Self {
        self.fail_with = Some(err);
        self
    }
}

impl<R: Record> DataSource<R> for CountingSource<R> {
    fn load(&self) -> Result<Vec<R>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.stall.is_zero() {
            thread::sleep(self.stall);
        }

        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(self.records.clone()),
        }
    }

    fn describe(&self) -> String {
        format!("counting<{}>", R::PATH)
    }
}
