//! Summary statistics and cross-series correlation over change series.
//!
//! Undefined statistics are represented by absence, never NaN: a series with
//! fewer than two qualifying values has no summary entry, and a correlation
//! cell with fewer than two paired values or zero variance is `None`.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::change::ChangeTable;

/// Inclusive date window. An open bound (`None`) is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Closed window `[start, end]`.
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// A window whose start is after its end can never contain anything.
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// Mean and sample standard deviation of one series' change values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
    pub observations: usize,
}

/// Summaries for every series with at least two qualifying values, in table
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub window: Option<DateWindow>,
    pub entries: Vec<SeriesSummary>,
}

impl SummaryStats {
    pub fn get(&self, name: &str) -> Option<&SeriesSummary> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summarize each change series, optionally restricted to `window`.
pub fn summarize(changes: &ChangeTable, window: Option<DateWindow>) -> SummaryStats {
    let entries = changes
        .series
        .par_iter()
        .filter_map(|series| {
            let values: Vec<f64> = series
                .points
                .iter()
                .filter(|(date, _)| window.map_or(true, |w| w.contains(*date)))
                .filter_map(|(_, v)| *v)
                .collect();
            let std_dev = sample_std_dev(&values)?;
            Some(SeriesSummary {
                name: series.name.clone(),
                mean: mean(&values)?,
                std_dev,
                observations: values.len(),
            })
        })
        .collect();

    SummaryStats { window, entries }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample (n − 1) standard deviation; `None` with fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    if is_constant(values) {
        return Some(0.0);
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Every value equals the first. Variance from a drifted mean is not
/// reliably zero for such samples.
fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

/// Pearson correlation of paired samples.
///
/// `None` when the slices differ in length, hold fewer than two pairs, or
/// either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    if is_constant(xs) || is_constant(ys) {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Square correlation matrix over all series, diagonal included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// `cells[i][j]` is the correlation of `names[i]` against `names[j]`.
    pub cells: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        self.cells[i][j]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Correlate every ordered pair of change series over the positions where
/// both have a value.
pub fn correlation_matrix(changes: &ChangeTable) -> CorrelationMatrix {
    let columns: Vec<Vec<Option<f64>>> = changes
        .series
        .iter()
        .map(|s| s.values().collect())
        .collect();

    let cells = columns
        .par_iter()
        .map(|left| {
            columns
                .iter()
                .map(|right| {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = left
                        .iter()
                        .zip(right)
                        .filter_map(|(l, r)| Some(((*l)?, (*r)?)))
                        .unzip();
                    pearson(&xs, &ys)
                })
                .collect()
        })
        .collect();

    CorrelationMatrix {
        names: changes.series.iter().map(|s| s.name.clone()).collect(),
        cells,
    }
}
