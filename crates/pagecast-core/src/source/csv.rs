use crate::{error::LoadError, source::DataSource, traits::Record};
use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

///
/// FromCsvRow
///
/// Decode one comma-separated row (header already skipped).
/// Fields are trimmed; quoting is not supported.
///

pub trait FromCsvRow: Sized {
    /// Number of columns a row must carry.
    const COLUMNS: usize;

    fn from_row(fields: &[&str]) -> Result<Self, String>;
}

///
/// CsvSource
///
/// Reads a headered CSV file into records.
/// Constructing one touches nothing; the file is read on `load`.
///

#[derive(Debug)]
pub struct CsvSource<R> {
    path: PathBuf,
    _marker: PhantomData<fn() -> R>,
}

impl<R> CsvSource<R> {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Record + FromCsvRow> CsvSource<R> {
    /// Decode CSV text already in memory; `label` names it in errors.
    pub fn parse_str(label: &str, text: &str) -> Result<Vec<R>, LoadError> {
        let mut records = Vec::new();

        for (index, line) in text.lines().enumerate().skip(1) {
            let line_no = index + 1;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
            if fields.len() != R::COLUMNS {
                return Err(LoadError::parse(
                    label,
                    line_no,
                    format!("expected {} columns, found {}", R::COLUMNS, fields.len()),
                ));
            }

            let record = R::from_row(&fields).map_err(|msg| LoadError::parse(label, line_no, msg))?;
            records.push(record);
        }

        Ok(records)
    }
}

impl<R: Record + FromCsvRow> DataSource<R> for CsvSource<R> {
    fn load(&self) -> Result<Vec<R>, LoadError> {
        let label = self.path.display().to_string();
        let text = fs::read_to_string(&self.path).map_err(|err| LoadError::io(&label, err))?;

        Self::parse_str(&label, &text)
    }

    fn describe(&self) -> String {
        format!("{} <- {}", R::PATH, self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Band;

    #[test]
    fn parse_skips_header_and_blank_lines() {
        let text = "band_id,name\n1,Nirvana\n\n2, Pearl Jam \r\n";
        let bands = CsvSource::<Band>::parse_str("inline", text).expect("bands should parse");

        assert_eq!(bands.len(), 2);
        assert_eq!(bands[1].band_id, 2);
        assert_eq!(bands[1].name, "Pearl Jam");
    }

    #[test]
    fn parse_reports_file_line_of_bad_row() {
        let text = "band_id,name\n1,Nirvana\nseven,Soundgarden\n";
        let err = CsvSource::<Band>::parse_str("bands.csv", text).expect_err("bad id must fail");

        assert!(matches!(err, LoadError::Parse { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn parse_rejects_wrong_column_count() {
        let text = "band_id,name\n1,Nirvana,extra\n";
        let err = CsvSource::<Band>::parse_str("bands.csv", text).expect_err("arity must fail");

        assert_eq!(
            err.to_string(),
            "malformed row in 'bands.csv' at line 2: expected 2 columns, found 3"
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = CsvSource::<Band>::new("/definitely/not/here/bands.csv");
        let err = source.load().expect_err("missing file must fail");

        assert!(matches!(err, LoadError::Io { .. }));
    }
}
