//! Date-indexed table of rate series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::loader::LoadError;

/// One named rate series, index-aligned with its table's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Dates plus named series, with `series.values.len() == dates.len()` for
/// every series. Series keep header order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesTable {
    dates: Vec<NaiveDate>,
    series: Vec<Series>,
}

impl SeriesTable {
    /// Build a table, rejecting series whose length differs from `dates`.
    pub fn new(dates: Vec<NaiveDate>, series: Vec<Series>) -> Result<Self, LoadError> {
        if let Some(bad) = series.iter().find(|s| s.values.len() != dates.len()) {
            return Err(LoadError::Misaligned {
                series: bad.name.clone(),
                values: bad.values.len(),
                dates: dates.len(),
            });
        }
        Ok(Self { dates, series })
    }

    /// Empty table with the given series names and no rows.
    pub(crate) fn with_names(names: Vec<String>) -> Self {
        Self {
            dates: Vec::new(),
            series: names.into_iter().map(|n| Series::new(n, Vec::new())).collect(),
        }
    }

    /// Append one row. `values` must hold one entry per series.
    pub(crate) fn push_row(&mut self, date: NaiveDate, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.series.len());
        self.dates.push(date);
        for (series, value) in self.series.iter_mut().zip(values) {
            series.values.push(value);
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }

    /// Number of rows (dates).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// `(date, value)` pairs for one series.
    pub fn points(&self, name: &str) -> Option<Vec<(NaiveDate, Option<f64>)>> {
        let series = self.get(name)?;
        Some(self.dates.iter().copied().zip(series.values.iter().copied()).collect())
    }

    /// First and last date, if any rows exist.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = *self.dates.iter().min()?;
        let last = *self.dates.iter().max()?;
        Some((first, last))
    }

    /// Reorder rows by ascending date. The sort is stable, so rows sharing a
    /// date keep their source order, and every series is permuted with the
    /// dates.
    pub fn sorted_by_date(self) -> Self {
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);

        let dates = order.iter().map(|&i| self.dates[i]).collect();
        let series = self
            .series
            .into_iter()
            .map(|s| Series {
                values: order.iter().map(|&i| s.values[i]).collect(),
                name: s.name,
            })
            .collect();

        Self { dates, series }
    }

    /// Append a reciprocal (`1 / x`) series for every series, named
    /// `"<name> inverse"`. Zero and missing values have no reciprocal.
    pub fn with_reciprocals(mut self) -> Self {
        let inverses: Vec<Series> = self
            .series
            .iter()
            .map(|s| Series {
                name: format!("{} inverse", s.name),
                values: s
                    .values
                    .iter()
                    .map(|v| v.filter(|x| *x != 0.0).map(|x| 1.0 / x))
                    .collect(),
            })
            .collect();
        self.series.extend(inverses);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table() -> SeriesTable {
        SeriesTable::new(
            vec![d("2020-01-15"), d("2020-01-01"), d("2020-01-08")],
            vec![
                Series::new("EUR", vec![Some(1.3), Some(1.1), None]),
                Series::new("JPY", vec![Some(110.0), Some(108.0), Some(0.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rejects_misaligned_series() {
        let err = SeriesTable::new(vec![d("2020-01-01")], vec![Series::new("EUR", vec![])])
            .unwrap_err();
        assert!(matches!(err, LoadError::Misaligned { .. }));
    }

    #[test]
    fn sort_keeps_values_aligned() {
        let sorted = table().sorted_by_date();
        assert_eq!(
            sorted.dates(),
            &[d("2020-01-01"), d("2020-01-08"), d("2020-01-15")]
        );
        assert_eq!(sorted.get("EUR").unwrap().values, vec![Some(1.1), None, Some(1.3)]);
        assert_eq!(
            sorted.get("JPY").unwrap().values,
            vec![Some(108.0), Some(0.0), Some(110.0)]
        );
    }

    #[test]
    fn reciprocals_skip_zero_and_missing() {
        let table = table().with_reciprocals();
        assert_eq!(table.series().len(), 4);
        let inv = table.get("JPY inverse").unwrap();
        assert_eq!(inv.values[2], None);
        assert!((inv.values[0].unwrap() - 1.0 / 110.0).abs() < 1e-15);
        assert_eq!(table.get("EUR inverse").unwrap().values[2], None);
    }

    #[test]
    fn date_range_ignores_row_order() {
        assert_eq!(table().date_range(), Some((d("2020-01-01"), d("2020-01-15"))));
        assert_eq!(SeriesTable::default().date_range(), None);
    }
}
