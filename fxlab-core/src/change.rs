//! Week-over-week change series.
//!
//! Percent: change[t] = (x[t] / x[t-1] - 1) * 100
//! Log:     change[t] = (ln x[t] - ln x[t-1]) * 100
//!
//! The look-back is exactly one row. `x[t-1]` is the previous row's raw value
//! whether or not it was usable, so a gap or a zero invalidates the change on
//! its own row and the row after, and nothing further.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::SeriesTable;

/// Which change formula to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeFormula {
    Percent,
    #[default]
    Log,
}

impl ChangeFormula {
    /// Change from `previous` to `current`, or `None` where undefined.
    pub fn apply(self, previous: Option<f64>, current: Option<f64>) -> Option<f64> {
        let (prev, curr) = (previous?, current?);
        match self {
            ChangeFormula::Percent => {
                if prev == 0.0 {
                    return None;
                }
                Some((curr / prev - 1.0) * 100.0)
            }
            ChangeFormula::Log => {
                if prev <= 0.0 || curr <= 0.0 {
                    return None;
                }
                Some((curr.ln() - prev.ln()) * 100.0)
            }
        }
    }

    /// Lowercase name used in file names and config (`percent`, `log`).
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeFormula::Percent => "percent",
            ChangeFormula::Log => "log",
        }
    }
}

impl fmt::Display for ChangeFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" | "pct" | "%" => Ok(ChangeFormula::Percent),
            "log" | "ln" => Ok(ChangeFormula::Log),
            other => Err(format!("unknown change formula '{other}' (expected percent or log)")),
        }
    }
}

/// Change values for one series, paired with the table's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
}

impl ChangeSeries {
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }
}

/// Change series for every series of a table, in table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeTable {
    pub formula: ChangeFormula,
    pub dates: Vec<NaiveDate>,
    pub series: Vec<ChangeSeries>,
}

impl ChangeTable {
    pub fn get(&self, name: &str) -> Option<&ChangeSeries> {
        self.series.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }
}

/// Apply `formula` to a single aligned value sequence. Output has the same
/// length as the input; the first entry is always `None`.
pub fn change_values(values: &[Option<f64>], formula: ChangeFormula) -> Vec<Option<f64>> {
    let mut previous: Option<f64> = None;
    values
        .iter()
        .map(|&current| {
            let change = formula.apply(previous, current);
            previous = current;
            change
        })
        .collect()
}

/// Compute change series for every series in `table`.
///
/// Rows are taken in the table's order; sort the table first if the source
/// was not chronological.
pub fn compute_changes(table: &SeriesTable, formula: ChangeFormula) -> ChangeTable {
    let series = table
        .series()
        .iter()
        .map(|s| ChangeSeries {
            name: s.name.clone(),
            points: table
                .dates()
                .iter()
                .copied()
                .zip(change_values(&s.values, formula))
                .collect(),
        })
        .collect();

    ChangeTable {
        formula,
        dates: table.dates().to_vec(),
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Series;

    fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn percent_change_basic() {
        let out = change_values(&[Some(100.0), Some(110.0)], ChangeFormula::Percent);
        assert_eq!(out[0], None);
        assert_approx(out[1].unwrap(), 10.0, 1e-9);
    }

    #[test]
    fn log_change_basic() {
        let out = change_values(&[Some(100.0), Some(110.0)], ChangeFormula::Log);
        assert_approx(out[1].unwrap(), 100.0 * 1.1_f64.ln(), 1e-12);
        assert_approx(out[1].unwrap(), 9.531018, 1e-6);
    }

    #[test]
    fn gap_invalidates_the_following_row_too() {
        for formula in [ChangeFormula::Percent, ChangeFormula::Log] {
            let out = change_values(&[Some(100.0), None, Some(110.0)], formula);
            assert_eq!(out, vec![None, None, None], "{formula}");
        }
    }

    #[test]
    fn zero_previous_is_undefined_and_still_advances() {
        let out = change_values(
            &[Some(100.0), Some(0.0), Some(50.0), Some(55.0)],
            ChangeFormula::Percent,
        );
        assert_approx(out[1].unwrap(), -100.0, 1e-9);
        assert_eq!(out[2], None);
        assert_approx(out[3].unwrap(), 10.0, 1e-9);
    }

    #[test]
    fn log_rejects_non_positive_on_either_side() {
        let out = change_values(
            &[Some(1.0), Some(-1.0), Some(2.0), Some(4.0)],
            ChangeFormula::Log,
        );
        assert_eq!(&out[..3], &[None, None, None]);
        assert_approx(out[3].unwrap(), 100.0 * 2.0_f64.ln(), 1e-12);
    }

    #[test]
    fn formula_parses_from_strings() {
        assert_eq!("Percent".parse::<ChangeFormula>(), Ok(ChangeFormula::Percent));
        assert_eq!("log".parse::<ChangeFormula>(), Ok(ChangeFormula::Log));
        assert!("cubic".parse::<ChangeFormula>().is_err());
    }

    #[test]
    fn compute_changes_pairs_dates() {
        let dates = vec![
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 8).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
        ];
        let table = SeriesTable::new(
            dates.clone(),
            vec![Series::new("EUR", vec![Some(1.10), Some(1.12), None])],
        )
        .unwrap();

        let changes = compute_changes(&table, ChangeFormula::Percent);
        let eur = changes.get("EUR").unwrap();
        assert_eq!(eur.points.len(), 3);
        assert_eq!(eur.points[0], (dates[0], None));
        assert_approx(eur.points[1].1.unwrap(), 1.818182, 1e-6);
        assert_eq!(eur.points[2], (dates[2], None));
    }
}
