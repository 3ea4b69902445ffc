use crate::{
    catalog::TrackLength,
    source::FromCsvRow,
    traits::{Path, Record},
};
use serde::Serialize;

fn parse_id(field: &str, column: &str) -> Result<u32, String> {
    field
        .parse::<u32>()
        .map_err(|_| format!("column '{column}' is not an unsigned integer: '{field}'"))
}

fn require_text(field: &str, column: &str) -> Result<String, String> {
    if field.is_empty() {
        return Err(format!("column '{column}' must not be empty"));
    }

    Ok(field.to_string())
}

///
/// Band
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Band {
    pub band_id: u32,
    pub name: String,
}

impl Path for Band {
    const PATH: &'static str = "pagecast::catalog::Band";
}

impl Record for Band {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.band_id
    }
}

impl FromCsvRow for Band {
    const COLUMNS: usize = 2;

    fn from_row(fields: &[&str]) -> Result<Self, String> {
        Ok(Self {
            band_id: parse_id(fields[0], "band_id")?,
            name: require_text(fields[1], "name")?,
        })
    }
}

///
/// Album
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Album {
    pub album_id: u32,
    pub band_id: u32,
    pub name: String,
    pub year: u16,
    pub genre: String,
}

impl Path for Album {
    const PATH: &'static str = "pagecast::catalog::Album";
}

impl Record for Album {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.album_id
    }
}

impl FromCsvRow for Album {
    const COLUMNS: usize = 5;

    fn from_row(fields: &[&str]) -> Result<Self, String> {
        let year = fields[3]
            .parse::<u16>()
            .map_err(|_| format!("column 'year' is not a year: '{}'", fields[3]))?;

        Ok(Self {
            album_id: parse_id(fields[0], "album_id")?,
            band_id: parse_id(fields[1], "band_id")?,
            name: require_text(fields[2], "name")?,
            year,
            genre: fields[4].to_string(),
        })
    }
}

///
/// Song
///
/// `band_id` and `album_id` are foreign keys into the other two stores.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Song {
    pub song_id: u32,
    pub name: String,
    pub length: TrackLength,
    pub band_id: u32,
    pub album_id: u32,
}

impl Path for Song {
    const PATH: &'static str = "pagecast::catalog::Song";
}

impl Record for Song {
    type Id = u32;

    fn id(&self) -> Self::Id {
        self.song_id
    }
}

impl FromCsvRow for Song {
    const COLUMNS: usize = 5;

    fn from_row(fields: &[&str]) -> Result<Self, String> {
        let length = fields[2]
            .parse::<TrackLength>()
            .map_err(|err| err.to_string())?;

        Ok(Self {
            song_id: parse_id(fields[0], "song_id")?,
            name: require_text(fields[1], "name")?,
            length,
            band_id: parse_id(fields[3], "band_id")?,
            album_id: parse_id(fields[4], "album_id")?,
        })
    }
}
