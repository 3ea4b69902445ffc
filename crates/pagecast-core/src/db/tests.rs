use crate::{
    catalog::Song,
    db::{Page, PaginationCursor, Paginator, Range, RecordStore},
    error::LoadError,
    test_support::{CountingSource, TOTAL_SONGS, song_store, songs},
};
use proptest::prelude::*;
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

fn page_sizes(pages: &[Page<Song>]) -> Vec<usize> {
    pages.iter().map(|page| page.len()).collect()
}

//
// RecordStore
//

#[test]
fn store_is_lazy_until_first_load() {
    let (source, calls) = CountingSource::new(songs(3));
    let store = RecordStore::new(source);

    assert!(!store.is_loaded());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    store.load().expect("load should succeed");
    assert!(store.is_loaded());
}

#[test]
fn store_loads_once_across_sequential_callers() {
    let (source, calls) = CountingSource::new(songs(5));
    let store = RecordStore::new(source);

    let first = store.load().expect("first load should succeed");
    let second = store.load().expect("second load should succeed");
    let _ = store.get_page(0, 2).expect("page should resolve");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(first.ptr_eq(&second), "callers must share one dataset");
}

#[test]
fn store_single_flights_concurrent_callers() {
    const CALLERS: usize = 8;

    let (source, calls) = CountingSource::new(songs(TOTAL_SONGS));
    let store = RecordStore::new(source.stalling(Duration::from_millis(50)));

    let datasets = thread::scope(|scope| {
        let handles = (0..CALLERS)
            .map(|_| scope.spawn(|| store.load().expect("concurrent load should succeed")))
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("loader thread should not panic"))
            .collect::<Vec<_>>()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(datasets.iter().all(|dataset| dataset.ptr_eq(&datasets[0])));
    assert_eq!(datasets[0].len(), TOTAL_SONGS);
}

#[test]
fn store_caches_and_replays_failures() {
    let (source, calls) = CountingSource::new(songs(3));
    let store = RecordStore::new(source.failing(LoadError::source("disk unplugged")));

    let first = store.load().expect_err("failing source must fail");
    let second = store.get_page(0, 1).expect_err("cached failure must replay");

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "failures are not retried");
    assert!(store.is_loaded());
}

#[test]
fn store_caches_a_panicking_source_as_a_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let store: RecordStore<Song> = RecordStore::new(move || -> Result<Vec<Song>, LoadError> {
        counter.fetch_add(1, Ordering::SeqCst);
        panic!("source blew up mid-read");
    });

    let first = catch_unwind(AssertUnwindSafe(|| store.load()))
        .expect("load must not unwind")
        .expect_err("panicking source must fail");
    let second = catch_unwind(AssertUnwindSafe(|| store.load()))
        .expect("load must not unwind")
        .expect_err("cached failure must replay");

    assert_eq!(first, LoadError::source("data source panicked"));
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "source must not re-run");
    assert!(store.is_loaded());
}

#[test]
fn store_rejects_duplicate_ids() {
    let mut records = songs(4);
    records[3].song_id = records[1].song_id;
    let store = RecordStore::from_records(records);

    let err = store.load().expect_err("duplicate ids must fail the load");

    assert!(matches!(err, LoadError::DuplicateId { id, .. } if id == "2"));
}

#[test]
fn out_of_range_page_is_empty_not_an_error() {
    let store = song_store(TOTAL_SONGS);

    let past_end = store.get_page(80, 90).expect("page should resolve");
    let tail = store.get_page(70, 77).expect("page should resolve");

    assert!(past_end.is_empty());
    assert_eq!(past_end.range(), Range::empty_at(76));
    assert_eq!(tail.len(), 6);
    assert_eq!(tail.range(), Range { start: 70, end: 76 });
    assert_eq!(tail[0].song_id, 71);
}

//
// Paginator
//

#[test]
fn paginates_76_records_into_eight_pages() {
    let store = song_store(TOTAL_SONGS);
    let mut paginator = Paginator::new(store, 10);

    let pages = paginator
        .by_ref()
        .collect::<Result<Vec<_>, _>>()
        .expect("pagination should not fail");

    assert_eq!(page_sizes(&pages), vec![10, 10, 10, 10, 10, 10, 10, 6]);
    assert!(paginator.cursor().is_exhausted());
    assert!(paginator.next().is_none(), "a ninth pull yields nothing");
    assert!(paginator.next().is_none(), "exhaustion is permanent");
}

#[test]
fn pagination_is_lazy_and_restartable() {
    let (source, calls) = CountingSource::new(songs(25));
    let store = Arc::new(RecordStore::new(source));

    let mut first = Paginator::new(Arc::clone(&store), 10);
    assert_eq!(calls.load(Ordering::SeqCst), 0, "building a paginator loads nothing");

    let _ = first.next();
    let restarted = Paginator::new(Arc::clone(&store), 10)
        .map(|page| page.expect("page should resolve").len())
        .collect::<Vec<_>>();

    assert_eq!(restarted, vec![10, 10, 5]);
    assert_eq!(first.cursor().page_index(), 1, "instances keep their own cursor");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn paginator_starts_at_one_based_page() {
    let store = song_store(TOTAL_SONGS);

    let ids = Paginator::starting_at_page(store, 10, 8)
        .flat_map(|page| page.expect("page should resolve").into_records())
        .map(|song| song.song_id)
        .collect::<Vec<_>>();

    assert_eq!(ids, (71..=76).collect::<Vec<u32>>());
}

#[test]
fn paginator_yields_failure_once_then_ends() {
    let (source, _) = CountingSource::new(songs(3));
    let store = Arc::new(RecordStore::new(source.failing(LoadError::source("nope"))));
    let mut paginator = Paginator::new(store, 2);

    assert!(matches!(paginator.next(), Some(Err(LoadError::Source { .. }))));
    assert!(paginator.next().is_none());
}

#[test]
fn zero_page_size_ends_immediately() {
    let mut paginator = Paginator::new(song_store(5), 0);

    assert!(paginator.next().is_none());
}

#[test]
fn cursor_window_respects_origin_and_limit() {
    let mut cursor = PaginationCursor::with_origin(38, 10);
    assert_eq!(cursor.window(Some(76)), (38, 48));

    cursor.advance();
    cursor.advance();
    cursor.advance();
    assert_eq!(cursor.offset(), 68);
    assert_eq!(cursor.window(Some(76)), (68, 76));
}

proptest! {
    #[test]
    fn pagination_reconstructs_dataset(total in 0usize..120, page_size in 1usize..25) {
        let store = song_store(total);

        let pages = Paginator::new(store, page_size)
            .collect::<Result<Vec<_>, _>>()
            .expect("pagination should not fail");

        prop_assert_eq!(pages.len(), total.div_ceil(page_size));
        prop_assert!(pages.iter().all(|page| !page.is_empty()));

        let ids = pages
            .into_iter()
            .flat_map(Page::into_records)
            .map(|song| song.song_id as usize)
            .collect::<Vec<_>>();
        prop_assert_eq!(ids, (1..=total).collect::<Vec<_>>());
    }
}
