//! FXLab CLI: weekly FX rate extraction, change statistics and charts.
//!
//! Commands:
//! - `extract`: dump one worksheet of an XLSX file to CSV, cell text untouched
//! - `analyze`: full pipeline from command-line flags
//! - `run`: full pipeline from a TOML run file
//! - `chart`: render one series to an SVG file
//! - `sheets`: list the worksheet parts in an XLSX file

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use fxlab_core::sheet::{list_worksheet_parts, SheetError, DEFAULT_WORKSHEET_PART};
use fxlab_core::ChangeFormula;
use fxlab_runner::{
    extract_to_csv, render_series_chart, run_analysis, AnalysisOutcome, ChartConfig, NamedWindow,
    RunConfig,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "fxlab",
    about = "FXLab CLI: weekly FX rate changes, statistics and charts"
)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one worksheet of an XLSX file to CSV.
    Extract {
        /// XLSX file to read.
        source: PathBuf,

        /// Worksheet part, e.g. sheet1.xml or xl/worksheets/sheet2.xml.
        #[arg(long, default_value = DEFAULT_WORKSHEET_PART)]
        sheet: String,

        /// Destination CSV file.
        #[arg(long, short, default_value = "raw_rates.csv")]
        output: PathBuf,
    },
    /// Compute changes, summaries, correlations and charts from flags.
    Analyze {
        /// XLSX or CSV file with a date column and one column per currency.
        source: PathBuf,

        /// Output directory for all artifacts.
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Worksheet part for XLSX sources.
        #[arg(long, default_value = DEFAULT_WORKSHEET_PART)]
        sheet: String,

        /// Change formula: percent or log.
        #[arg(long, default_value = "log")]
        formula: ChangeFormula,

        /// Extra summary window, repeatable. Either date may be omitted.
        #[arg(long = "window", value_name = "LABEL=START..END")]
        windows: Vec<NamedWindow>,

        /// Add a 1/x series for every currency.
        #[arg(long, default_value_t = false)]
        reciprocals: bool,

        /// Keep source row order instead of sorting by date.
        #[arg(long, default_value_t = false)]
        no_sort: bool,

        /// Skip SVG chart output.
        #[arg(long, default_value_t = false)]
        no_charts: bool,

        /// Year gridline interval; 0 draws value gridlines only.
        #[arg(long, default_value_t = 5)]
        year_interval: u16,

        /// Caption drawn under the chart title.
        #[arg(long)]
        caption: Option<String>,
    },
    /// Execute a run described by a TOML file.
    Run {
        /// Path to the TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Override the file's output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Render a single series to SVG.
    Chart {
        /// XLSX or CSV source.
        source: PathBuf,

        /// Series (column header) to draw.
        #[arg(long)]
        series: String,

        /// Destination SVG file.
        #[arg(long, short, default_value = "chart.svg")]
        output: PathBuf,

        /// Worksheet part for XLSX sources.
        #[arg(long, default_value = DEFAULT_WORKSHEET_PART)]
        sheet: String,

        /// Year gridline interval; 0 draws value gridlines only.
        #[arg(long, default_value_t = 5)]
        year_interval: u16,

        #[arg(long, default_value_t = 1200)]
        width: u32,

        #[arg(long, default_value_t = 600)]
        height: u32,

        /// Caption drawn under the chart title.
        #[arg(long)]
        caption: Option<String>,
    },
    /// List worksheet parts in an XLSX file.
    Sheets {
        /// XLSX file to inspect.
        source: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Extract {
            source,
            sheet,
            output,
        } => run_extract(&source, &sheet, &output),
        Commands::Analyze {
            source,
            output_dir,
            sheet,
            formula,
            windows,
            reciprocals,
            no_sort,
            no_charts,
            year_interval,
            caption,
        } => {
            let mut config = RunConfig::new(&source);
            config.output_dir = output_dir;
            config.sheet = sheet;
            config.formula = formula;
            config.windows = windows;
            config.reciprocals = reciprocals;
            config.sort_by_date = !no_sort;
            config.chart.enabled = !no_charts;
            config.chart.year_interval = year_interval;
            config.chart.caption = caption;
            run_pipeline(&config)
        }
        Commands::Run { config, output_dir } => {
            let mut config = RunConfig::from_file(&config)?;
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            run_pipeline(&config)
        }
        Commands::Chart {
            source,
            series,
            output,
            sheet,
            year_interval,
            width,
            height,
            caption,
        } => {
            let chart = ChartConfig {
                width,
                height,
                year_interval,
                caption,
                ..ChartConfig::default()
            };
            run_chart(&source, &sheet, &series, &output, &chart)
        }
        Commands::Sheets { source } => run_sheets(&source),
    };

    if let Err(err) = &result {
        hint_missing_sheet(err);
    }
    result
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_extract(source: &Path, sheet: &str, output: &Path) -> Result<()> {
    let grid = extract_to_csv(source, sheet, output)?;
    println!(
        "Extracted {} rows x {} columns to {}",
        grid.row_count(),
        grid.column_count(),
        output.display()
    );
    Ok(())
}

fn run_pipeline(config: &RunConfig) -> Result<()> {
    let outcome = run_analysis(config)?;
    print_summary(&outcome);
    Ok(())
}

fn run_chart(
    source: &Path,
    sheet: &str,
    series: &str,
    output: &Path,
    chart: &ChartConfig,
) -> Result<()> {
    if render_series_chart(source, sheet, series, output, chart)? {
        println!("Chart saved to: {}", output.display());
    } else {
        println!("'{series}' has no values; nothing written");
    }
    Ok(())
}

fn run_sheets(source: &Path) -> Result<()> {
    let parts = list_worksheet_parts(source)?;
    if parts.is_empty() {
        println!("No worksheets found in {}", source.display());
    }
    for part in parts {
        println!("{part}");
    }
    Ok(())
}

/// When a worksheet part is missing, list the parts that do exist.
fn hint_missing_sheet(err: &anyhow::Error) {
    let Some(SheetError::NotFound { source_name, .. }) =
        err.chain().find_map(|e| e.downcast_ref::<SheetError>())
    else {
        return;
    };
    if let Ok(parts) = list_worksheet_parts(Path::new(source_name)) {
        if !parts.is_empty() {
            eprintln!("Available worksheets: {}", parts.join(", "));
        }
    }
}

fn print_summary(outcome: &AnalysisOutcome) {
    let m = &outcome.manifest;
    println!();
    println!("=== FXLab Analysis ===");
    println!("Source:         {}", m.source);
    if let Some(sheet) = &m.sheet {
        println!("Worksheet:      {sheet}");
    }
    if let (Some(first), Some(last)) = (m.first_date, m.last_date) {
        println!("Period:         {first} to {last}");
    }
    println!(
        "Rows:           {} loaded ({} skipped)",
        m.rows_loaded, m.rows_skipped
    );
    println!("Series:         {}", m.series.len());
    println!("Formula:        {}", m.formula);

    for (label, stats) in &outcome.summaries {
        println!();
        println!("--- Weekly {} change: {label} ---", m.formula);
        if stats.is_empty() {
            println!("(no series with two or more changes)");
            continue;
        }
        println!("{:<24} {:>10} {:>10} {:>6}", "Currency", "Mean", "Std Dev", "N");
        for entry in &stats.entries {
            println!(
                "{:<24} {:>10.4} {:>10.4} {:>6}",
                entry.name, entry.mean, entry.std_dev, entry.observations
            );
        }
    }

    println!();
    println!("Charts:         {}", outcome.charts_written);
    println!("Artifacts saved to: {}", outcome.output_dir.display());
}
