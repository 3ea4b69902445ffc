//! Module: catalog
//! Responsibility: the music catalog records and the lookups across them.
//! Does not own: loading or paging (see `db`).

mod length;
mod model;

#[cfg(test)]
mod tests;

pub use length::{TrackLength, TrackLengthError};
pub use model::{Album, Band, Song};

use crate::{
    db::RecordStore,
    error::LoadError,
    query::PageQuery,
    source::CsvSource,
};
use std::{path::Path, sync::Arc};

pub const BANDS_FILE: &str = "bands.csv";
pub const ALBUMS_FILE: &str = "albums.csv";
pub const SONGS_FILE: &str = "songs.csv";

///
/// Catalog
///
/// Bands, albums and songs, each behind its own memoized store.
/// Nothing is read until a lookup needs it.
///

#[derive(Clone, Debug)]
pub struct Catalog {
    bands: Arc<RecordStore<Band>>,
    albums: Arc<RecordStore<Album>>,
    songs: Arc<RecordStore<Song>>,
}

impl Catalog {
    #[must_use]
    pub const fn new(
        bands: Arc<RecordStore<Band>>,
        albums: Arc<RecordStore<Album>>,
        songs: Arc<RecordStore<Song>>,
    ) -> Self {
        Self {
            bands,
            albums,
            songs,
        }
    }

    /// Catalog over `bands.csv`, `albums.csv` and `songs.csv` in `dir`.
    #[must_use]
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        Self::new(
            Arc::new(RecordStore::new(CsvSource::new(dir.join(BANDS_FILE)))),
            Arc::new(RecordStore::new(CsvSource::new(dir.join(ALBUMS_FILE)))),
            Arc::new(RecordStore::new(CsvSource::new(dir.join(SONGS_FILE)))),
        )
    }

    #[must_use]
    pub const fn bands(&self) -> &Arc<RecordStore<Band>> {
        &self.bands
    }

    #[must_use]
    pub const fn albums(&self) -> &Arc<RecordStore<Album>> {
        &self.albums
    }

    #[must_use]
    pub const fn songs(&self) -> &Arc<RecordStore<Song>> {
        &self.songs
    }

    /// Paging surface over the songs.
    #[must_use]
    pub fn songs_query(&self) -> PageQuery<Song> {
        PageQuery::new(Arc::clone(&self.songs))
    }

    /// First band with exactly this name.
    pub fn band_by_name(&self, name: &str) -> Result<Option<Band>, LoadError> {
        let bands = self.bands.load()?;

        Ok(bands.iter().find(|band| band.name == name).cloned())
    }

    pub fn songs_by_band(&self, band_id: u32) -> Result<Vec<Song>, LoadError> {
        let songs = self.songs.load()?;

        Ok(songs
            .iter()
            .filter(|song| song.band_id == band_id)
            .cloned()
            .collect())
    }

    pub fn albums_by_band(&self, band_id: u32) -> Result<Vec<Album>, LoadError> {
        let albums = self.albums.load()?;

        Ok(albums
            .iter()
            .filter(|album| album.band_id == band_id)
            .cloned()
            .collect())
    }

    /// Songs of the named band; empty when no band has that name.
    /// The song store is not touched for an unknown band.
    pub fn band_songs(&self, name: &str) -> Result<Vec<Song>, LoadError> {
        match self.band_by_name(name)? {
            Some(band) => self.songs_by_band(band.band_id),
            None => Ok(Vec::new()),
        }
    }
}

/// Combined running time of `songs`.
pub fn total_length<'a>(songs: impl IntoIterator<Item = &'a Song>) -> TrackLength {
    songs.into_iter().map(|song| song.length).sum()
}
