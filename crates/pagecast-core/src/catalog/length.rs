use serde::Serialize;
use std::{fmt, iter::Sum, str::FromStr};
use thiserror::Error as ThisError;

///
/// TrackLength
///
/// Running time of a track, stored as whole seconds.
/// Parsed from `m:ss` or `h:mm:ss`.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct TrackLength(u32);

impl TrackLength {
    #[must_use]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    #[must_use]
    pub const fn as_secs(self) -> u32 {
        self.0
    }
}

impl Sum for TrackLength {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Self(iter.fold(0u32, |acc, len| acc.saturating_add(len.0)))
    }
}

impl fmt::Display for TrackLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 % 3600) / 60;
        let seconds = self.0 % 60;

        if hours > 0 {
            write!(f, "{hours}:{minutes:02}:{seconds:02}")
        } else {
            write!(f, "{minutes}:{seconds:02}")
        }
    }
}

///
/// TrackLengthError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TrackLengthError {
    #[error("track length '{0}' must look like m:ss or h:mm:ss")]
    Shape(String),

    #[error("track length '{0}' has a non-numeric segment")]
    NotNumeric(String),

    #[error("track length '{0}' has a segment of 60 or more")]
    OutOfRange(String),
}

impl FromStr for TrackLength {
    type Err = TrackLengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim().split(':').collect::<Vec<_>>();
        if !(2..=3).contains(&parts.len()) || parts.iter().any(|part| part.is_empty()) {
            return Err(TrackLengthError::Shape(s.to_string()));
        }

        let mut values = Vec::with_capacity(parts.len());
        for part in &parts {
            let value = part
                .parse::<u32>()
                .map_err(|_| TrackLengthError::NotNumeric(s.to_string()))?;
            values.push(value);
        }

        // The leading segment is unbounded; every later one is base 60.
        if values[1..].iter().any(|v| *v >= 60) {
            return Err(TrackLengthError::OutOfRange(s.to_string()));
        }

        let secs = values
            .iter()
            .fold(0u32, |acc, v| acc.saturating_mul(60).saturating_add(*v));

        Ok(Self(secs))
    }
}
