//! CSV sink with read-back validation.
//!
//! Artifact contract: header `date,open,close`, one row per day, dates in
//! `YYYY-MM-DD` form, ascending. The series is written to a sibling `.tmp`
//! file, validated by re-reading it, and only then renamed into place, so a
//! failed run leaves any previous artifact untouched.

use crate::series::PriceSeries;
use chrono::{Datelike, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Expected header, in order.
const HEADER: [&str; 3] = ["date", "open", "close"];

/// Row counts below the configured minimum raise a warning, not an error.
pub const DEFAULT_MIN_ROWS: usize = 100;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("refusing to persist an empty series")]
    EmptySeries,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("read-back validation failed: {0}")]
    ReadBack(String),
}

/// What the sink observed about the artifact it just validated.
#[derive(Debug, Clone)]
pub struct PersistReport {
    pub path: PathBuf,
    pub rows: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Calendar years covered, inclusive.
    pub year_span: u32,
    pub warnings: Vec<String>,
}

/// Durable CSV destination for the canonical series.
pub struct CsvSink {
    path: PathBuf,
    min_rows: usize,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, min_rows: usize) -> Self {
        Self {
            path: path.into(),
            min_rows,
        }
    }

    /// Write the series and confirm it by re-reading.
    ///
    /// The only mutating operation in the crate. Atomic from the caller's
    /// perspective: the artifact is replaced only after the temp file has
    /// passed schema and row-count validation.
    pub fn persist(&self, series: &PriceSeries) -> Result<PersistReport, SinkError> {
        if series.is_empty() {
            return Err(SinkError::EmptySeries);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        if let Err(e) = write_csv(&tmp_path, series) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        let mut report = match read_back(&tmp_path, series.len()) {
            Ok(report) => report,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            SinkError::Io(e)
        })?;

        report.path = self.path.clone();
        if report.rows < self.min_rows {
            report.warnings.push(format!(
                "only {} rows persisted (below the {}-row minimum)",
                report.rows, self.min_rows
            ));
        }

        Ok(report)
    }
}

fn write_csv(path: &Path, series: &PriceSeries) -> Result<(), SinkError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;
    for row in series.rows() {
        writer.write_record([
            row.date.to_string(),
            row.open.to_string(),
            row.close.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Re-read the artifact and confirm schema, row count, and date sanity.
fn read_back(path: &Path, expected_rows: usize) -> Result<PersistReport, SinkError> {
    let mut reader = csv::Reader::from_path(path)?;

    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|field| field.to_string())
        .collect();
    if header != HEADER {
        return Err(SinkError::ReadBack(format!(
            "unexpected header {header:?}, want {HEADER:?}"
        )));
    }

    let mut rows = 0usize;
    let mut first_date: Option<NaiveDate> = None;
    let mut last_date: Option<NaiveDate> = None;

    for record in reader.records() {
        let record = record?;
        if record.len() != HEADER.len() {
            return Err(SinkError::ReadBack(format!(
                "row {} has {} fields",
                rows + 1,
                record.len()
            )));
        }

        let date = NaiveDate::parse_from_str(&record[0], "%Y-%m-%d")
            .map_err(|e| SinkError::ReadBack(format!("bad date {:?}: {e}", &record[0])))?;
        for field in [&record[1], &record[2]] {
            field
                .parse::<f64>()
                .map_err(|e| SinkError::ReadBack(format!("bad price {field:?}: {e}")))?;
        }

        first_date.get_or_insert(date);
        last_date = Some(date);
        rows += 1;
    }

    if rows != expected_rows {
        return Err(SinkError::ReadBack(format!(
            "row count {rows} does not match the {expected_rows} rows written"
        )));
    }

    // rows >= 1 here: expected_rows is the length of a non-empty series
    let first_date = first_date.unwrap();
    let last_date = last_date.unwrap();

    Ok(PersistReport {
        path: path.to_path_buf(),
        rows,
        first_date,
        last_date,
        year_span: (last_date.year() - first_date.year() + 1) as u32,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PriceRow;
    use std::io::Write;

    const EPSILON: f64 = 1e-9;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_series() -> PriceSeries {
        PriceSeries::normalize(
            vec![
                PriceRow {
                    date: d("2021-01-01"),
                    open: 100.0,
                    close: 105.0,
                },
                PriceRow {
                    date: d("2021-01-02"),
                    open: 105.0,
                    close: 98.5,
                },
            ],
            d("2024-01-01"),
        )
    }

    fn read_rows(path: &Path) -> Vec<(NaiveDate, f64, f64)> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| {
                let r = r.unwrap();
                (
                    d(&r[0]),
                    r[1].parse::<f64>().unwrap(),
                    r[2].parse::<f64>().unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn persist_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc_prices.csv");
        let sink = CsvSink::new(&path, 1);

        let report = sink.persist(&sample_series()).unwrap();

        assert_eq!(report.rows, 2);
        assert_eq!(report.first_date, d("2021-01-01"));
        assert_eq!(report.last_date, d("2021-01-02"));
        assert_eq!(report.year_span, 1);
        assert!(report.warnings.is_empty());

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, d("2021-01-01"));
        assert!((rows[0].1 - 100.0).abs() < EPSILON);
        assert!((rows[0].2 - 105.0).abs() < EPSILON);
        assert!((rows[1].1 - 105.0).abs() < EPSILON);
        assert!((rows[1].2 - 98.5).abs() < EPSILON);
    }

    #[test]
    fn empty_series_is_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc_prices.csv");
        let sink = CsvSink::new(&path, 1);

        let err = sink.persist(&PriceSeries::default()).unwrap_err();

        assert!(matches!(err, SinkError::EmptySeries));
        assert!(!path.exists());
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn short_series_warns_but_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc_prices.csv");
        let sink = CsvSink::new(&path, DEFAULT_MIN_ROWS);

        let report = sink.persist(&sample_series()).unwrap();

        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("below the 100-row minimum"));
        assert!(path.exists());
    }

    #[test]
    fn year_span_covers_inclusive_calendar_years() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc_prices.csv");
        let sink = CsvSink::new(&path, 1);

        let series = PriceSeries::normalize(
            vec![
                PriceRow {
                    date: d("2019-12-31"),
                    open: 1.0,
                    close: 1.0,
                },
                PriceRow {
                    date: d("2021-01-01"),
                    open: 1.0,
                    close: 1.0,
                },
            ],
            d("2024-01-01"),
        );

        let report = sink.persist(&series).unwrap();
        assert_eq!(report.year_span, 3);
    }

    #[test]
    fn read_back_rejects_wrong_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "date,Open,Close").unwrap();
        writeln!(f, "2021-01-01,1.0,2.0").unwrap();

        let err = read_back(&path, 1).unwrap_err();
        assert!(matches!(err, SinkError::ReadBack(_)));
    }

    #[test]
    fn read_back_rejects_row_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "date,open,close").unwrap();
        writeln!(f, "2021-01-01,1.0,2.0").unwrap();

        let err = read_back(&path, 2).unwrap_err();
        assert!(matches!(err, SinkError::ReadBack(_)));
    }

    #[test]
    fn read_back_rejects_unparseable_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "date,open,close").unwrap();
        writeln!(f, "not-a-date,1.0,2.0").unwrap();

        let err = read_back(&path, 1).unwrap_err();
        assert!(matches!(err, SinkError::ReadBack(_)));
    }

    #[test]
    fn failed_validation_leaves_previous_artifact_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc_prices.csv");
        let sink = CsvSink::new(&path, 1);

        sink.persist(&sample_series()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        let err = sink.persist(&PriceSeries::default()).unwrap_err();
        assert!(matches!(err, SinkError::EmptySeries));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }
}
