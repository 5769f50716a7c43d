//! Delimited-text loading into a `SeriesTable`.
//!
//! The first header containing "date" (case-insensitive) is the date column;
//! if none does, the first column is. Every other column is a series. Rows
//! with an empty, placeholder or unparseable date are skipped; cells that do
//! not parse as numbers become gaps. Neither condition is an error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::parse::{parse_date, parse_rate};
use super::table::SeriesTable;
use crate::sheet::WorksheetGrid;

/// Structural loading failures. Row-level problems never produce these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("input has no header row")]
    MissingHeader,

    #[error("series '{series}' has {values} values but the table has {dates} dates")]
    Misaligned {
        series: String,
        values: usize,
        dates: usize,
    },
}

/// What the loader did with the input rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Header of the column used for dates.
    pub date_column: String,
    /// Data rows seen (header excluded).
    pub rows_read: usize,
    /// Rows dropped for a missing or unparseable date, or unreadable text.
    pub rows_skipped: usize,
}

impl LoadReport {
    pub fn rows_loaded(&self) -> usize {
        self.rows_read - self.rows_skipped
    }
}

/// Index of the date column: first header containing "date", else 0.
pub fn find_date_column(header: &[String]) -> usize {
    header
        .iter()
        .position(|h| h.to_lowercase().contains("date"))
        .unwrap_or(0)
}

/// Load a CSV file from disk.
pub fn load_series_file(path: &Path) -> Result<(SeriesTable, LoadReport), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    load_series_csv(file)
}

/// Load CSV text with a header row.
pub fn load_series_csv<R: Read>(reader: R) -> Result<(SeriesTable, LoadReport), LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = rdr.records();
    let header: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(String::from).collect(),
        None => return Err(LoadError::MissingHeader),
    };

    let mut builder = TableBuilder::new(&header);
    for (i, record) in records.enumerate() {
        match record {
            Ok(record) => builder.push(|col| record.get(col).unwrap_or("")),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!(row = i + 2, error = %e, "skipping unreadable CSV row");
                builder.skip();
            }
        }
    }
    Ok(builder.finish())
}

impl SeriesTable {
    /// Load directly from an extracted worksheet grid, with the same column
    /// and row rules as `load_series_csv`.
    pub fn from_grid(grid: &WorksheetGrid) -> Result<(SeriesTable, LoadReport), LoadError> {
        if grid.header.is_empty() {
            return Err(LoadError::MissingHeader);
        }
        let mut builder = TableBuilder::new(&grid.header);
        for row in &grid.rows {
            builder.push(|col| row.get(col).map_or("", String::as_str));
        }
        Ok(builder.finish())
    }
}

/// Row-at-a-time accumulator shared by the CSV and grid entry points.
struct TableBuilder {
    date_col: usize,
    series_cols: Vec<usize>,
    table: SeriesTable,
    report: LoadReport,
}

impl TableBuilder {
    fn new(header: &[String]) -> Self {
        let header: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.clone()
                }
            })
            .collect();
        let date_col = find_date_column(&header);
        let series_cols: Vec<usize> = (0..header.len()).filter(|&c| c != date_col).collect();
        let names = unique_names(series_cols.iter().map(|&c| header[c].as_str()));

        Self {
            date_col,
            series_cols,
            table: SeriesTable::with_names(names),
            report: LoadReport {
                date_column: header.get(date_col).cloned().unwrap_or_default(),
                ..LoadReport::default()
            },
        }
    }

    fn push<'a>(&mut self, cell: impl Fn(usize) -> &'a str) {
        self.report.rows_read += 1;
        let raw_date = cell(self.date_col);
        let Some(date) = parse_date(raw_date) else {
            debug!(row = self.report.rows_read + 1, date = raw_date, "skipping row without a usable date");
            self.report.rows_skipped += 1;
            return;
        };
        let values = self.series_cols.iter().map(|&c| parse_rate(cell(c))).collect();
        self.table.push_row(date, values);
    }

    fn skip(&mut self) {
        self.report.rows_read += 1;
        self.report.rows_skipped += 1;
    }

    fn finish(self) -> (SeriesTable, LoadReport) {
        if self.report.rows_skipped > 0 {
            warn!(
                skipped = self.report.rows_skipped,
                read = self.report.rows_read,
                "skipped rows without a usable date"
            );
        }
        (self.table, self.report)
    }
}

/// Make repeated header names distinct by suffixing ` (2)`, ` (3)`, ...
fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let mut candidate = name.to_string();
        let mut n = 2;
        while out.contains(&candidate) {
            candidate = format!("{name} ({n})");
            n += 1;
        }
        out.push(candidate);
    }
    out
}
