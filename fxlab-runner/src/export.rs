//! Reporting and export: CSV and Markdown artifact generation.
//!
//! Every export function returns the file body as a `String`; the pipeline
//! decides where it lands. Numbers are written with six decimals and an
//! undefined value is an empty cell, never `NaN`.

use std::collections::HashSet;

use anyhow::{Context, Result};
use fxlab_core::{ChangeFormula, ChangeTable, CorrelationMatrix, SummaryStats, WorksheetGrid};

use crate::manifest::RunManifest;

/// Bridge file holding the raw extracted worksheet.
pub const RAW_RATES_FILE: &str = "raw_rates.csv";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const REPORT_FILE: &str = "report.md";
pub const PLOTS_DIR: &str = "plots";

// ─── File names ─────────────────────────────────────────────────────

pub fn changes_file_name(formula: ChangeFormula) -> String {
    format!("weekly_{formula}_changes.csv")
}

/// `label` is `"full"` for the unrestricted summary.
pub fn stats_file_name(formula: ChangeFormula, label: &str) -> String {
    format!("weekly_{formula}_change_stats_{label}.csv")
}

pub fn correlation_file_name(formula: ChangeFormula) -> String {
    format!("weekly_{formula}_change_correlation.csv")
}

/// Turn a series name into a file stem: ASCII letters, digits, `-`, `_`
/// and `.` are kept, everything else becomes `_`.
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "series".to_string()
    } else {
        stem.to_string()
    }
}

/// Chart file names for `names`, in order, made unique by appending
/// `_2`, `_3`, ... when two series sanitize to the same stem.
pub fn chart_file_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut used = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let stem = sanitize_file_stem(name);
            let mut candidate = format!("{stem}.svg");
            let mut n = 2;
            while !used.insert(candidate.to_ascii_lowercase()) {
                candidate = format!("{stem}_{n}.svg");
                n += 1;
            }
            candidate
        })
        .collect()
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Header plus every row of an extracted worksheet, text untouched.
pub fn export_grid_csv(grid: &WorksheetGrid) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    if grid.is_empty() {
        return finish(wtr);
    }
    wtr.write_record(&grid.header)?;
    for row in &grid.rows {
        wtr.write_record(row)?;
    }
    finish(wtr)
}

/// `Date` (ISO) plus one column per change series.
pub fn export_changes_csv(changes: &ChangeTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["Date".to_string()];
    header.extend(changes.names().map(str::to_string));
    wtr.write_record(&header)?;

    for (row, date) in changes.dates.iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(
            changes
                .series
                .iter()
                .map(|s| format_value(s.points.get(row).and_then(|(_, v)| *v))),
        );
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Columns: Currency, Mean, Std Dev, Observations.
pub fn export_summary_csv(stats: &SummaryStats) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Currency", "Mean", "Std Dev", "Observations"])?;
    for entry in &stats.entries {
        wtr.write_record([
            entry.name.clone(),
            format!("{:.6}", entry.mean),
            format!("{:.6}", entry.std_dev),
            entry.observations.to_string(),
        ])?;
    }
    finish(wtr)
}

/// `Currency` plus one column per series; blank where undefined.
pub fn export_correlation_csv(matrix: &CorrelationMatrix) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["Currency".to_string()];
    header.extend(matrix.names.iter().cloned());
    wtr.write_record(&header)?;

    for (name, row) in matrix.names.iter().zip(&matrix.cells) {
        let mut record = Vec::with_capacity(header.len());
        record.push(name.clone());
        record.extend(row.iter().map(|v| format_value(*v)));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Human-readable run summary: inputs, one table per window, and the
/// strongest cross-series correlations.
pub fn generate_report(
    manifest: &RunManifest,
    summaries: &[(String, SummaryStats)],
    correlation: &CorrelationMatrix,
) -> String {
    let mut md = String::with_capacity(4096);

    md.push_str("# FXLab Weekly Change Report\n\n");

    md.push_str("## Inputs\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Source | {} |\n", manifest.source));
    md.push_str(&format!("| BLAKE3 | `{}` |\n", manifest.source_hash));
    md.push_str(&format!("| Formula | {} |\n", manifest.formula));
    if let (Some(first), Some(last)) = (manifest.first_date, manifest.last_date) {
        md.push_str(&format!("| Period | {first} to {last} |\n"));
    }
    md.push_str(&format!(
        "| Rows | {} loaded, {} skipped |\n",
        manifest.rows_loaded, manifest.rows_skipped
    ));
    md.push_str(&format!("| Series | {} |\n", manifest.series.len()));
    md.push('\n');

    for (label, stats) in summaries {
        md.push_str(&format!("## Summary: {label}\n\n"));
        if stats.is_empty() {
            md.push_str("_No series has two or more changes in this window._\n\n");
            continue;
        }
        md.push_str("| Currency | Mean | Std Dev | Observations |\n");
        md.push_str("| --- | ---: | ---: | ---: |\n");
        for entry in &stats.entries {
            md.push_str(&format!(
                "| {} | {:+.4} | {:.4} | {} |\n",
                entry.name, entry.mean, entry.std_dev, entry.observations
            ));
        }
        md.push('\n');
    }

    let pairs = top_correlations(correlation, 10);
    if !pairs.is_empty() {
        md.push_str("## Strongest Correlations\n\n");
        md.push_str("| Pair | r |\n");
        md.push_str("| --- | ---: |\n");
        for (a, b, r) in pairs {
            md.push_str(&format!("| {a} / {b} | {r:+.4} |\n"));
        }
        md.push('\n');
    }

    md
}

/// Off-diagonal pairs ordered by absolute coefficient, strongest first.
fn top_correlations(matrix: &CorrelationMatrix, limit: usize) -> Vec<(&str, &str, f64)> {
    let mut pairs: Vec<(&str, &str, f64)> = Vec::new();
    for i in 0..matrix.len() {
        for j in (i + 1)..matrix.len() {
            if let Some(r) = matrix.cells[i][j] {
                pairs.push((matrix.names[i].as_str(), matrix.names[j].as_str(), r));
            }
        }
    }
    pairs.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));
    pairs.truncate(limit);
    pairs
}
