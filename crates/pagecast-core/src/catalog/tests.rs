use super::*;
use crate::test_support::CountingSource;
use std::sync::atomic::Ordering;

fn band(band_id: u32, name: &str) -> Band {
    Band {
        band_id,
        name: name.to_string(),
    }
}

fn album(album_id: u32, band_id: u32, name: &str) -> Album {
    Album {
        album_id,
        band_id,
        name: name.to_string(),
        year: 1991,
        genre: "grunge".to_string(),
    }
}

fn song(song_id: u32, band_id: u32, secs: u32) -> Song {
    Song {
        song_id,
        name: format!("song-{song_id}"),
        length: TrackLength::from_secs(secs),
        band_id,
        album_id: band_id,
    }
}

fn catalog() -> Catalog {
    Catalog::new(
        Arc::new(RecordStore::from_records(vec![
            band(1, "Nirvana"),
            band(2, "Pearl Jam"),
        ])),
        Arc::new(RecordStore::from_records(vec![
            album(1, 1, "Nevermind"),
            album(2, 2, "Ten"),
            album(3, 1, "In Utero"),
        ])),
        Arc::new(RecordStore::from_records(vec![
            song(1, 1, 301),
            song(2, 2, 245),
            song(3, 1, 219),
            song(4, 2, 340),
        ])),
    )
}

#[test]
fn band_songs_filters_by_resolved_band() {
    let songs = catalog().band_songs("Nirvana").expect("in-memory catalog loads");

    assert_eq!(
        songs.iter().map(|song| song.song_id).collect::<Vec<u32>>(),
        vec![1, 3]
    );
    assert_eq!(total_length(&songs).to_string(), "8:40");
}

#[test]
fn unknown_band_is_empty_and_leaves_songs_unloaded() {
    let (source, calls) = CountingSource::new(vec![song(1, 1, 200)]);
    let catalog = Catalog::new(
        Arc::new(RecordStore::from_records(vec![band(1, "Nirvana")])),
        Arc::new(RecordStore::from_records(Vec::new())),
        Arc::new(RecordStore::new(source)),
    );

    let songs = catalog
        .band_songs("Mudhoney")
        .expect("unknown band is not an error");

    assert!(songs.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!catalog.songs().is_loaded());
}

#[test]
fn albums_by_band_keeps_source_order() {
    let albums = catalog().albums_by_band(1).expect("in-memory catalog loads");

    assert_eq!(
        albums.iter().map(|album| album.name.as_str()).collect::<Vec<_>>(),
        vec!["Nevermind", "In Utero"]
    );
}

#[test]
fn band_by_name_is_exact() {
    let catalog = catalog();

    assert_eq!(
        catalog.band_by_name("Pearl Jam").expect("loads"),
        Some(band(2, "Pearl Jam"))
    );
    assert_eq!(catalog.band_by_name("pearl jam").expect("loads"), None);
}

#[test]
fn songs_query_pages_the_song_store() {
    let page = catalog()
        .songs_query()
        .get_page(1, 3)
        .expect("in-memory catalog loads");

    assert_eq!(
        page.iter().map(|song| song.song_id).collect::<Vec<u32>>(),
        vec![2, 3]
    );
}

#[test]
fn missing_directory_surfaces_io_error() {
    let catalog = Catalog::from_dir("/definitely/not/a/pagecast/dir");

    let err = catalog
        .band_songs("Nirvana")
        .expect_err("missing files must fail");

    assert!(matches!(err, LoadError::Io { .. }));
}
