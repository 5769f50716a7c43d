//! Rectangular grid of raw worksheet cell text.

use serde::{Deserialize, Serialize};

use super::worksheet::SparseRow;

/// Header row plus data rows, all exactly `column_count()` cells wide.
///
/// Cell values are the worksheet's original text; numbers are never parsed
/// here, so `"1.2345678901234567"` survives byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksheetGrid {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl WorksheetGrid {
    /// Densify sparse rows. Width is one past the highest column seen in any
    /// row; the first row becomes the header.
    pub fn from_sparse_rows(sparse: Vec<SparseRow>) -> Self {
        let width = sparse
            .iter()
            .filter_map(SparseRow::max_column)
            .max()
            .map_or(0, |max| max + 1);

        let mut dense = sparse.into_iter().map(|row| row.into_dense(width));
        let Some(header) = dense.next() else {
            return Self::default();
        };

        Self {
            header,
            rows: dense.collect(),
        }
    }

    /// Number of columns shared by the header and every row.
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(cells: &[(usize, &str)]) -> SparseRow {
        let mut row = SparseRow::new();
        for (col, value) in cells {
            row.insert(*col, (*value).to_string());
        }
        row
    }

    #[test]
    fn pads_every_row_to_the_widest() {
        let grid = WorksheetGrid::from_sparse_rows(vec![
            sparse(&[(0, "Date"), (1, "EUR")]),
            sparse(&[(0, "1/1/2020"), (3, "x")]),
            SparseRow::new(),
        ]);
        assert_eq!(grid.column_count(), 4);
        assert_eq!(grid.header, vec!["Date", "EUR", "", ""]);
        assert_eq!(grid.rows.len(), 2);
        for row in &grid.rows {
            assert_eq!(row.len(), 4);
        }
        assert_eq!(grid.rows[1], vec!["", "", "", ""]);
    }

    #[test]
    fn no_rows_yields_an_empty_grid() {
        let grid = WorksheetGrid::from_sparse_rows(Vec::new());
        assert!(grid.is_empty());
        assert_eq!(grid.column_count(), 0);
    }
}
