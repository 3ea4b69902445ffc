//! Module: source
//! Responsibility: the capability a store loads its records from.
//! Does not own: memoization (see `db::store`) or range resolution.

mod csv;

pub use csv::{CsvSource, FromCsvRow};

use crate::{error::LoadError, traits::Record};

///
/// DataSource
///
/// Produces the full ordered record collection or fails.
/// Invoking `load` may perform I/O; stores call it at most once.
///

pub trait DataSource<R: Record>: Send + Sync {
    fn load(&self) -> Result<Vec<R>, LoadError>;

    /// Short human label for logs.
    fn describe(&self) -> String {
        R::PATH.to_string()
    }
}

impl<R, F> DataSource<R> for F
where
    R: Record,
    F: Fn() -> Result<Vec<R>, LoadError> + Send + Sync,
{
    fn load(&self) -> Result<Vec<R>, LoadError> {
        self()
    }
}
