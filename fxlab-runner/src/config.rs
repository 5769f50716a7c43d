//! Serializable run configuration.
//!
//! A run is fully described by a `RunConfig`: where the rates come from,
//! where outputs go, which change formula to apply, which named date windows
//! to summarize, and how to draw charts. It loads from TOML, and every field
//! except `source` has a default so a minimal file is one line long.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use fxlab_core::chart::{ChartGeometry, ChartStyle};
use fxlab_core::sheet::DEFAULT_WORKSHEET_PART;
use fxlab_core::{ChangeFormula, DateWindow};
use serde::{Deserialize, Serialize};

/// Label reserved for the unrestricted summary file.
pub const FULL_WINDOW_LABEL: &str = "full";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("window '{label}' starts after it ends ({start} > {end})")]
    InvertedWindow {
        label: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    #[error("window label '{0}' must be non-empty ASCII letters, digits, '-' or '_' and not 'full'")]
    InvalidLabel(String),
    #[error("window label '{0}' is used more than once")]
    DuplicateWindow(String),
    #[error("invalid window '{input}': {reason}")]
    WindowSyntax { input: String, reason: String },
    #[error("chart padding {padding} leaves no plot area in a {width}x{height} canvas")]
    InvalidGeometry { width: u32, height: u32, padding: u32 },
}

/// Input format, decided from the source file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Xlsx,
    Csv,
}

impl SourceKind {
    /// `.xlsx` and `.xlsm` are spreadsheet packages; anything else is read as
    /// delimited text.
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("xlsx") | Some("xlsm") => SourceKind::Xlsx,
            _ => SourceKind::Csv,
        }
    }
}

/// A labelled date window. Either bound may be open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedWindow {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl NamedWindow {
    pub fn new(label: impl Into<String>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start, self.end)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let label_ok = !self.label.is_empty()
            && self.label != FULL_WINDOW_LABEL
            && self
                .label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !label_ok {
            return Err(ConfigError::InvalidLabel(self.label.clone()));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ConfigError::InvertedWindow {
                    label: self.label.clone(),
                    start,
                    end,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for NamedWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=", self.label)?;
        if let Some(start) = self.start {
            write!(f, "{start}")?;
        }
        f.write_str("..")?;
        if let Some(end) = self.end {
            write!(f, "{end}")?;
        }
        Ok(())
    }
}

/// Parses `LABEL=START..END` with ISO dates; either date may be left empty.
impl FromStr for NamedWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = |reason: &str| ConfigError::WindowSyntax {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let (label, range) = s.split_once('=').ok_or_else(|| syntax("expected LABEL=START..END"))?;
        let (start, end) = range
            .split_once("..")
            .ok_or_else(|| syntax("expected '..' between dates"))?;

        let parse_bound = |text: &str| -> Result<Option<NaiveDate>, ConfigError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(Some)
                .map_err(|e| syntax(&format!("bad date '{text}': {e}")))
        };

        let window = NamedWindow::new(label.trim(), parse_bound(start)?, parse_bound(end)?);
        window.validate()?;
        Ok(window)
    }
}

/// Chart output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Write one SVG per series under `plots/`.
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    /// Vertical gridline spacing in years; 0 draws value gridlines only.
    pub year_interval: u16,
    pub y_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        let geometry = ChartGeometry::default();
        Self {
            enabled: true,
            width: geometry.width,
            height: geometry.height,
            padding: geometry.padding,
            year_interval: 5,
            y_label: "Exchange Rate".into(),
            caption: None,
        }
    }
}

impl ChartConfig {
    pub fn geometry(&self) -> ChartGeometry {
        ChartGeometry {
            width: self.width,
            height: self.height,
            padding: self.padding,
        }
    }

    /// The padding must leave a plot area inside the canvas.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geometry().is_valid() {
            Ok(())
        } else {
            Err(ConfigError::InvalidGeometry {
                width: self.width,
                height: self.height,
                padding: self.padding,
            })
        }
    }

    pub fn style(&self) -> ChartStyle {
        match self.year_interval {
            0 => ChartStyle::Plain,
            interval => ChartStyle::YearGrid { interval },
        }
    }
}

/// Complete description of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// XLSX package or CSV file holding the weekly rates.
    pub source: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Worksheet part to extract when `source` is a spreadsheet.
    #[serde(default = "default_sheet")]
    pub sheet: String,

    #[serde(default)]
    pub formula: ChangeFormula,

    /// Sort rows chronologically before computing changes.
    #[serde(default = "default_true")]
    pub sort_by_date: bool,

    /// Append a `1/x` series for every currency.
    #[serde(default)]
    pub reciprocals: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<NamedWindow>,

    #[serde(default)]
    pub chart: ChartConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_sheet() -> String {
    DEFAULT_WORKSHEET_PART.to_string()
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Config with defaults for everything but the source.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output_dir: default_output_dir(),
            sheet: default_sheet(),
            formula: ChangeFormula::default(),
            sort_by_date: true,
            reciprocals: false,
            windows: Vec::new(),
            chart: ChartConfig::default(),
        }
    }

    /// Load and validate a run config from a TOML file.
    ///
    /// A relative `source` or `output_dir` is resolved against the file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            if config.source.is_relative() {
                config.source = base.join(&config.source);
            }
            if config.output_dir.is_relative() {
                config.output_dir = base.join(&config.output_dir);
            }
        }
        Ok(config)
    }

    /// Parse and validate a run config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn source_kind(&self) -> SourceKind {
        SourceKind::detect(&self.source)
    }

    /// Cross-field checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for window in &self.windows {
            window.validate()?;
            if !seen.insert(window.label.as_str()) {
                return Err(ConfigError::DuplicateWindow(window.label.clone()));
            }
        }
        if self.chart.enabled {
            self.chart.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = RunConfig::from_toml(r#"source = "rates.xlsx""#).unwrap();
        assert_eq!(config, RunConfig::new("rates.xlsx"));
        assert_eq!(config.formula, ChangeFormula::Log);
        assert_eq!(config.sheet, "sheet1.xml");
        assert_eq!(config.source_kind(), SourceKind::Xlsx);
        assert_eq!(config.chart.style(), ChartStyle::YearGrid { interval: 5 });
    }

    #[test]
    fn full_toml() {
        let toml = r#"
source = "data/weekly.csv"
output_dir = "out"
formula = "percent"
reciprocals = true

[[windows]]
label = "2004-2015"
start = "2004-01-01"
end = "2015-12-31"

[[windows]]
label = "recent"
start = "2016-01-01"

[chart]
year_interval = 0
caption = "Source: Bloomberg"
"#;
        let config = RunConfig::from_toml(toml).unwrap();
        assert_eq!(config.source_kind(), SourceKind::Csv);
        assert_eq!(config.formula, ChangeFormula::Percent);
        assert!(config.reciprocals);
        assert!(config.sort_by_date);
        assert_eq!(config.windows.len(), 2);
        assert_eq!(config.windows[1].end, None);
        assert_eq!(config.chart.style(), ChartStyle::Plain);
        assert_eq!(config.chart.width, 1200);
        assert_eq!(config.chart.caption.as_deref(), Some("Source: Bloomberg"));
    }

    #[test]
    fn toml_round_trip() {
        let mut config = RunConfig::new("rates.xlsx");
        config.formula = ChangeFormula::Percent;
        config.windows = vec![
            NamedWindow::new("early", Some(ymd(2004, 1, 1)), Some(ymd(2015, 12, 31))),
            NamedWindow::new("late", Some(ymd(2016, 1, 1)), None),
        ];
        config.chart.caption = Some("Source: Bloomberg".into());

        let text = config.to_toml().unwrap();
        assert_eq!(RunConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let toml = r#"
source = "rates.xlsx"
[[windows]]
label = "bad"
start = "2015-01-01"
end = "2004-01-01"
"#;
        assert!(matches!(
            RunConfig::from_toml(toml),
            Err(ConfigError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn duplicate_and_reserved_labels_are_rejected() {
        let mut config = RunConfig::new("rates.csv");
        config.windows = vec![
            NamedWindow::new("a", None, None),
            NamedWindow::new("a", None, None),
        ];
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateWindow(_))));

        config.windows = vec![NamedWindow::new("full", None, None)];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLabel(_))));

        config.windows = vec![NamedWindow::new("a/b", None, None)];
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLabel(_))));
    }

    #[test]
    fn padding_must_leave_a_plot_area() {
        let mut config = RunConfig::new("rates.csv");
        config.chart.padding = 300;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGeometry { .. })));
        config.chart.enabled = false;
        assert!(config.validate().is_ok());

        // Huge padding saturates instead of overflowing.
        config.chart.enabled = true;
        config.chart.padding = u32::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGeometry { .. })));
    }

    #[test]
    fn unknown_formula_is_a_parse_error() {
        let toml = "source = \"a.csv\"\nformula = \"cubic\"";
        assert!(matches!(RunConfig::from_toml(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn window_syntax() {
        let w: NamedWindow = "2004-2015=2004-01-01..2015-12-31".parse().unwrap();
        assert_eq!(w.label, "2004-2015");
        assert_eq!(w.start, Some(ymd(2004, 1, 1)));
        assert_eq!(w.end, Some(ymd(2015, 12, 31)));
        assert_eq!(w.to_string(), "2004-2015=2004-01-01..2015-12-31");

        let open: NamedWindow = "recent=2016-01-01..".parse().unwrap();
        assert_eq!(open.end, None);
        assert!(open.window().contains(ymd(2030, 1, 1)));

        assert!(matches!(
            "nolabel".parse::<NamedWindow>(),
            Err(ConfigError::WindowSyntax { .. })
        ));
        assert!(matches!(
            "x=2016-01-01".parse::<NamedWindow>(),
            Err(ConfigError::WindowSyntax { .. })
        ));
        assert!(matches!(
            "x=01/01/2016..".parse::<NamedWindow>(),
            Err(ConfigError::WindowSyntax { .. })
        ));
        assert!(matches!(
            "x=2016-01-01..2015-01-01".parse::<NamedWindow>(),
            Err(ConfigError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn source_kind_from_extension() {
        assert_eq!(SourceKind::detect(Path::new("a/Rates.XLSX")), SourceKind::Xlsx);
        assert_eq!(SourceKind::detect(Path::new("a.xlsm")), SourceKind::Xlsx);
        assert_eq!(SourceKind::detect(Path::new("a.csv")), SourceKind::Csv);
        assert_eq!(SourceKind::detect(Path::new("rates")), SourceKind::Csv);
    }
}
