//! Run orchestration: load rates, compute changes, summarize, render and
//! write every artifact for one `RunConfig`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use fxlab_core::chart::{render_svg, ChartSpec};
use fxlab_core::data::load_series_csv;
use fxlab_core::sheet::{extract_worksheet, extract_worksheet_from_reader, worksheet_part_name};
use fxlab_core::{
    compute_changes, correlation_matrix, summarize, CorrelationMatrix, LoadReport, SeriesTable,
    SummaryStats, WorksheetGrid,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{ChartConfig, RunConfig, SourceKind, FULL_WINDOW_LABEL};
use crate::export::{
    changes_file_name, chart_file_names, correlation_file_name, export_changes_csv,
    export_correlation_csv, export_grid_csv, export_summary_csv, generate_report,
    stats_file_name, MANIFEST_FILE, PLOTS_DIR, RAW_RATES_FILE, REPORT_FILE,
};
use crate::manifest::{write_manifest, RunManifest, SCHEMA_VERSION};

/// A rate table plus everything learned while reading it.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub kind: SourceKind,
    /// BLAKE3 hex digest of the file bytes.
    pub hash: String,
    /// Resolved worksheet part, for spreadsheet sources.
    pub sheet: Option<String>,
    /// Raw extracted cells, for spreadsheet sources.
    pub grid: Option<WorksheetGrid>,
    pub table: SeriesTable,
    pub report: LoadReport,
}

/// Read a spreadsheet or CSV source into a `SeriesTable`.
///
/// The file is read once; its bytes feed both the hash and the parser.
pub fn load_source(path: &Path, sheet: &str) -> Result<LoadedSource> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let hash = blake3::hash(&bytes).to_hex().to_string();
    let kind = SourceKind::detect(path);
    let source_name = path.display().to_string();

    let loaded = match kind {
        SourceKind::Xlsx => {
            let grid = extract_worksheet_from_reader(Cursor::new(bytes.as_slice()), &source_name, sheet)
                .with_context(|| format!("failed to extract worksheet from {source_name}"))?;
            let (table, report) = SeriesTable::from_grid(&grid)
                .with_context(|| format!("failed to load rates from {source_name}"))?;
            LoadedSource {
                kind,
                hash,
                sheet: Some(worksheet_part_name(sheet)),
                grid: Some(grid),
                table,
                report,
            }
        }
        SourceKind::Csv => {
            let (table, report) = load_series_csv(bytes.as_slice())
                .with_context(|| format!("failed to load rates from {source_name}"))?;
            LoadedSource {
                kind,
                hash,
                sheet: None,
                grid: None,
                table,
                report,
            }
        }
    };

    info!(
        source = source_name.as_str(),
        kind = ?loaded.kind,
        date_column = loaded.report.date_column.as_str(),
        rows = loaded.report.rows_loaded(),
        skipped = loaded.report.rows_skipped,
        series = loaded.table.series().len(),
        "loaded rates"
    );
    Ok(loaded)
}

/// Extract one worksheet and write it verbatim as CSV to `dest`.
pub fn extract_to_csv(source: &Path, sheet: &str, dest: &Path) -> Result<WorksheetGrid> {
    let grid = extract_worksheet(source, sheet)
        .with_context(|| format!("failed to extract worksheet from {}", source.display()))?;
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let csv = export_grid_csv(&grid)?;
    std::fs::write(dest, csv).with_context(|| format!("failed to write {}", dest.display()))?;
    info!(
        dest = %dest.display(),
        columns = grid.column_count(),
        rows = grid.row_count(),
        "wrote raw worksheet"
    );
    Ok(grid)
}

/// Build the chart input for one series with the configured look.
pub fn chart_spec(
    name: &str,
    points: Vec<(chrono::NaiveDate, Option<f64>)>,
    chart: &ChartConfig,
) -> ChartSpec {
    ChartSpec::new(name, points)
        .with_geometry(chart.geometry())
        .with_style(chart.style())
        .with_y_label(chart.y_label.clone())
        .with_caption(chart.caption.clone())
}

/// Render a single series from `source` to an SVG file.
///
/// Returns `false` (and writes nothing) when the series has no values.
pub fn render_series_chart(
    source: &Path,
    sheet: &str,
    series: &str,
    dest: &Path,
    chart: &ChartConfig,
) -> Result<bool> {
    chart.validate().context("invalid chart settings")?;
    let loaded = load_source(source, sheet)?;
    let table = loaded.table.sorted_by_date();
    let points = table.points(series).with_context(|| {
        let available: Vec<&str> = table.names().collect();
        format!("no series named '{series}' (available: {})", available.join(", "))
    })?;

    let Some(svg) = render_svg(&chart_spec(series, points, chart)) else {
        warn!(series, "series has no values; no chart written");
        return Ok(false);
    };
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(dest, svg).with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(true)
}

/// Everything a run produced, for callers that print or inspect results.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub output_dir: PathBuf,
    pub manifest: RunManifest,
    /// `("full", ..)` first, then one entry per configured window.
    pub summaries: Vec<(String, SummaryStats)>,
    pub correlation: CorrelationMatrix,
    pub charts_written: usize,
}

/// Files written so far, relative to the output directory.
struct OutputDir {
    root: PathBuf,
    files: Vec<String>,
}

impl OutputDir {
    fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create output dir: {}", root.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
            files: Vec::new(),
        })
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        let path = self.root.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(file = name, bytes = contents.len(), "wrote artifact");
        self.files.push(name.to_string());
        Ok(())
    }
}

/// Execute a full analysis run.
///
/// Writes, under `config.output_dir`: the raw worksheet (spreadsheet
/// sources), the change table, one summary per window plus the full-range
/// summary, the correlation matrix, per-series charts, a Markdown report and
/// `manifest.json`.
pub fn run_analysis(config: &RunConfig) -> Result<AnalysisOutcome> {
    config.validate().context("invalid run configuration")?;
    let started = Utc::now();

    let loaded = load_source(&config.source, &config.sheet)?;
    let mut out = OutputDir::create(&config.output_dir)?;

    if let Some(grid) = &loaded.grid {
        out.write(RAW_RATES_FILE, &export_grid_csv(grid)?)?;
    }

    let mut table = loaded.table;
    if config.sort_by_date {
        table = table.sorted_by_date();
    }
    if config.reciprocals {
        table = table.with_reciprocals();
    }

    let formula = config.formula;
    let changes = compute_changes(&table, formula);
    out.write(&changes_file_name(formula), &export_changes_csv(&changes)?)?;

    let mut summaries = vec![(FULL_WINDOW_LABEL.to_string(), summarize(&changes, None))];
    for named in &config.windows {
        let stats = summarize(&changes, Some(named.window()));
        if stats.is_empty() {
            warn!(window = %named, "no series has two or more changes in window");
        }
        summaries.push((named.label.clone(), stats));
    }
    for (label, stats) in &summaries {
        out.write(&stats_file_name(formula, label), &export_summary_csv(stats)?)?;
    }

    let correlation = correlation_matrix(&changes);
    out.write(&correlation_file_name(formula), &export_correlation_csv(&correlation)?)?;

    let charts = if config.chart.enabled {
        write_charts(&table, &config.chart, &config.output_dir)?
    } else {
        Vec::new()
    };
    let charts_written = charts.len();
    out.files.extend(charts);

    let (first_date, last_date) = table.date_range().unzip();
    let mut manifest = RunManifest {
        schema_version: SCHEMA_VERSION,
        created_at: started,
        source: config.source.display().to_string(),
        source_hash: loaded.hash,
        source_kind: loaded.kind,
        sheet: loaded.sheet,
        formula,
        date_column: loaded.report.date_column.clone(),
        rows_read: loaded.report.rows_read,
        rows_loaded: loaded.report.rows_loaded(),
        rows_skipped: loaded.report.rows_skipped,
        first_date,
        last_date,
        series: table.names().map(str::to_string).collect(),
        windows: config.windows.clone(),
        files: Vec::new(),
    };

    out.write(REPORT_FILE, &generate_report(&manifest, &summaries, &correlation))?;
    out.files.push(MANIFEST_FILE.to_string());
    manifest.files = out.files.clone();
    write_manifest(&config.output_dir.join(MANIFEST_FILE), &manifest)?;

    info!(
        output_dir = %config.output_dir.display(),
        files = manifest.files.len(),
        charts = charts_written,
        "analysis complete"
    );

    Ok(AnalysisOutcome {
        output_dir: config.output_dir.clone(),
        manifest,
        summaries,
        correlation,
        charts_written,
    })
}

/// Render every series in parallel into `<dir>/plots/`. Returns the written
/// paths relative to `dir`, in series order.
fn write_charts(table: &SeriesTable, chart: &ChartConfig, dir: &Path) -> Result<Vec<String>> {
    let plots = dir.join(PLOTS_DIR);
    std::fs::create_dir_all(&plots)
        .with_context(|| format!("failed to create {}", plots.display()))?;

    let file_names = chart_file_names(table.names());
    let written: Vec<Option<String>> = table
        .series()
        .par_iter()
        .zip(file_names.par_iter())
        .map(|(series, file_name)| -> Result<Option<String>> {
            let points = table
                .dates()
                .iter()
                .copied()
                .zip(series.values.iter().copied())
                .collect();
            let Some(svg) = render_svg(&chart_spec(&series.name, points, chart)) else {
                debug!(series = series.name.as_str(), "no values; chart skipped");
                return Ok(None);
            };
            let path = plots.join(file_name);
            std::fs::write(&path, svg)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(Some(format!("{PLOTS_DIR}/{file_name}")))
        })
        .collect::<Result<_>>()?;

    Ok(written.into_iter().flatten().collect())
}
