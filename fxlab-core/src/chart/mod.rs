//! SVG line charts for one rate series.
//!
//! Rendering is pure: a `ChartSpec` in, an SVG document string out. Geometry
//! and styling are fixed defaults apart from canvas size, padding, the
//! year-gridline interval and the text labels.

pub mod scale;

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub use scale::PlotArea;

/// Number of intervals between horizontal value gridlines.
pub const VALUE_TICK_INTERVALS: usize = 10;

const GRID_COLOR: &str = "#e0e0e0";
const LINE_COLOR: &str = "#2f6fb0";
const LABEL_COLOR: &str = "#444";
const TITLE_COLOR: &str = "#222";

/// Canvas size and padding in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartGeometry {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
}

impl Default for ChartGeometry {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            padding: 50,
        }
    }
}

impl ChartGeometry {
    /// The plot area left after padding has positive width and height.
    pub fn is_valid(&self) -> bool {
        let span = self.padding.saturating_mul(2);
        self.width > span && self.height > span
    }
}

/// Vertical gridline policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartStyle {
    /// Horizontal value gridlines only.
    Plain,
    /// Also draw labelled vertical gridlines at years that are multiples of
    /// `interval`.
    YearGrid { interval: u16 },
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle::YearGrid { interval: 5 }
    }
}

/// Immutable input for one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub points: Vec<(NaiveDate, Option<f64>)>,
    pub geometry: ChartGeometry,
    pub style: ChartStyle,
    pub x_label: String,
    pub y_label: String,
    pub caption: Option<String>,
}

impl ChartSpec {
    pub fn new(title: impl Into<String>, points: Vec<(NaiveDate, Option<f64>)>) -> Self {
        Self {
            title: title.into(),
            points,
            geometry: ChartGeometry::default(),
            style: ChartStyle::default(),
            x_label: "Year".into(),
            y_label: "Exchange Rate".into(),
            caption: None,
        }
    }

    pub fn with_geometry(mut self, geometry: ChartGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_y_label(mut self, label: impl Into<String>) -> Self {
        self.y_label = label.into();
        self
    }

    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption;
        self
    }
}

/// Render `spec` as a self-contained SVG document.
///
/// Returns `None` when the series has no values at all.
pub fn render_svg(spec: &ChartSpec) -> Option<String> {
    let points: Vec<(usize, f64)> = spec
        .points
        .iter()
        .enumerate()
        .filter_map(|(i, (_, v))| v.map(|v| (i, v)))
        .collect();
    let area = PlotArea::fit(&points, spec.geometry)?;

    let ChartGeometry {
        width,
        height,
        padding,
    } = spec.geometry;
    let (w, h, pad) = (width as f64, height as f64, padding as f64);

    let polyline = points
        .iter()
        .map(|&(i, v)| format!("{:.2},{:.2}", area.x(i as f64), area.y(v)))
        .collect::<Vec<_>>()
        .join(" ");

    let year_ticks = match spec.style {
        ChartStyle::Plain => Vec::new(),
        ChartStyle::YearGrid { interval } => year_ticks(&spec.points, interval)
            .into_iter()
            .map(|(year, index)| (year, area.x(index as f64)))
            .filter(|&(_, px)| area.contains_x(px))
            .collect(),
    };
    let value_ticks: Vec<(f64, f64)> = area
        .value_ticks(VALUE_TICK_INTERVALS)
        .into_iter()
        .map(|v| (v, area.y(v)))
        .collect();

    let mut svg = String::with_capacity(8 * 1024 + points.len() * 16);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\" />\n");

    for &(_, px) in &year_ticks {
        let _ = writeln!(
            svg,
            r#"  <line x1="{px:.2}" y1="{pad}" x2="{px:.2}" y2="{}" stroke="{GRID_COLOR}" stroke-width="1" />"#,
            h - pad
        );
    }
    for &(_, py) in &value_ticks {
        let _ = writeln!(
            svg,
            r#"  <line x1="{pad}" y1="{py:.2}" x2="{}" y2="{py:.2}" stroke="{GRID_COLOR}" stroke-width="1" />"#,
            w - pad
        );
    }

    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" font-size="20" text-anchor="middle" fill="{TITLE_COLOR}">{}</text>"#,
        w / 2.0,
        pad / 2.0,
        escape(&spec.title)
    );
    if let Some(caption) = &spec.caption {
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{}" font-size="12" text-anchor="middle" fill="{LABEL_COLOR}">{}</text>"#,
            w / 2.0,
            pad / 2.0 + 16.0,
            escape(caption)
        );
    }
    let _ = writeln!(
        svg,
        r#"  <polyline points="{polyline}" fill="none" stroke="{LINE_COLOR}" stroke-width="2" />"#
    );

    for &(year, px) in &year_ticks {
        let _ = writeln!(
            svg,
            r#"  <text x="{px:.2}" y="{}" font-size="12" text-anchor="middle" fill="{LABEL_COLOR}">{year}</text>"#,
            h - pad / 2.0
        );
    }
    for &(value, py) in &value_ticks {
        let _ = writeln!(
            svg,
            r#"  <text x="{}" y="{:.2}" font-size="12" text-anchor="end" fill="{LABEL_COLOR}">{value:.4}</text>"#,
            pad - 8.0,
            py + 4.0
        );
    }

    let _ = writeln!(
        svg,
        r#"  <text x="{}" y="{}" font-size="14" text-anchor="middle" fill="{TITLE_COLOR}">{}</text>"#,
        w / 2.0,
        h - 10.0,
        escape(&spec.x_label)
    );
    let _ = writeln!(
        svg,
        r#"  <text x="20" y="{mid}" font-size="14" text-anchor="middle" fill="{TITLE_COLOR}" transform="rotate(-90, 20, {mid})">{}</text>"#,
        escape(&spec.y_label),
        mid = h / 2.0
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{pad}" y="{pad}" font-size="12" fill="{LABEL_COLOR}">Max: {:.4}</text>"#,
        area.y_max()
    );
    let _ = writeln!(
        svg,
        r#"  <text x="{pad}" y="{}" font-size="12" fill="{LABEL_COLOR}">Min: {:.4}</text>"#,
        pad + 16.0,
        area.y_min()
    );
    svg.push_str("</svg>\n");

    Some(svg)
}

/// Years to mark with a vertical gridline, each paired with the row index of
/// that year's first date.
///
/// Candidate years are multiples of `interval` from the first year through
/// the last; a multiple that falls before the first year is dropped, as is
/// any year with no rows.
pub fn year_ticks(points: &[(NaiveDate, Option<f64>)], interval: u16) -> Vec<(i32, usize)> {
    let interval = i32::from(interval.max(1));
    let Some(first) = points.iter().map(|(d, _)| d.year()).min() else {
        return Vec::new();
    };
    let last = points.iter().map(|(d, _)| d.year()).max().unwrap_or(first);

    let start = first.div_euclid(interval) * interval;
    (start..=last)
        .step_by(interval as usize)
        .filter(|&year| year >= first)
        .filter_map(|year| {
            points
                .iter()
                .position(|(d, _)| d.year() == year)
                .map(|index| (year, index))
        })
        .collect()
}

/// Escape text content for embedding in SVG.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weekly(start: NaiveDate, values: &[Option<f64>]) -> Vec<(NaiveDate, Option<f64>)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + chrono::Duration::weeks(i as i64), *v))
            .collect()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn polyline_points(svg: &str) -> Vec<(f64, f64)> {
        let start = svg.find("<polyline points=\"").unwrap() + "<polyline points=\"".len();
        let end = start + svg[start..].find('"').unwrap();
        svg[start..end]
            .split(' ')
            .map(|pair| {
                let (x, y) = pair.split_once(',').unwrap();
                (x.parse().unwrap(), y.parse().unwrap())
            })
            .collect()
    }

    #[test]
    fn geometry_needs_room_inside_padding() {
        assert!(ChartGeometry::default().is_valid());
        let narrow = ChartGeometry {
            width: 100,
            ..ChartGeometry::default()
        };
        assert!(!narrow.is_valid());
        let huge = ChartGeometry {
            padding: u32::MAX,
            ..ChartGeometry::default()
        };
        assert!(!huge.is_valid());
    }

    #[test]
    fn all_missing_renders_nothing() {
        let spec = ChartSpec::new("EUR", weekly(ymd(2020, 1, 1), &[None, None]));
        assert!(render_svg(&spec).is_none());
        let spec = ChartSpec::new("EUR", Vec::new());
        assert!(render_svg(&spec).is_none());
    }

    #[test]
    fn single_point_is_centred() {
        let spec = ChartSpec::new("EUR", weekly(ymd(2020, 1, 1), &[None, Some(1.1), None]));
        let svg = render_svg(&spec).unwrap();
        assert_eq!(polyline_points(&svg), vec![(600.0, 300.0)]);
    }

    #[test]
    fn constant_series_has_vertical_extent() {
        let spec = ChartSpec::new("JPY", weekly(ymd(2020, 1, 1), &[Some(2.0); 4]));
        let svg = render_svg(&spec).unwrap();
        let pts = polyline_points(&svg);
        assert_eq!(pts.len(), 4);
        assert!(pts.iter().all(|(_, y)| *y == 300.0));
        assert!(svg.contains("Max: 3.0000"));
        assert!(svg.contains("Min: 1.0000"));
    }

    #[test]
    fn polyline_skips_gaps_and_spans_the_plot() {
        let spec = ChartSpec::new(
            "GBP",
            weekly(ymd(2020, 1, 1), &[Some(1.0), None, Some(3.0), Some(2.0)]),
        );
        let pts = polyline_points(&render_svg(&spec).unwrap());
        assert_eq!(pts, vec![(50.0, 550.0), (783.33, 50.0), (1150.0, 300.0)]);
    }

    #[test]
    fn draws_eleven_value_gridlines() {
        let spec = ChartSpec::new("EUR", weekly(ymd(2020, 1, 1), &[Some(1.0), Some(2.0)]))
            .with_style(ChartStyle::Plain);
        let svg = render_svg(&spec).unwrap();
        assert_eq!(svg.matches("<line ").count(), VALUE_TICK_INTERVALS + 1);
    }

    #[test]
    fn year_ticks_use_the_interval_and_first_occurrence() {
        let points = vec![
            (ymd(2003, 6, 1), Some(1.0)),
            (ymd(2005, 1, 7), Some(1.0)),
            (ymd(2005, 1, 14), Some(1.0)),
            (ymd(2009, 3, 1), None),
            (ymd(2010, 1, 1), Some(1.0)),
            (ymd(2016, 1, 1), Some(1.0)),
        ];
        // 2000 precedes the first year; 2015 has no rows.
        assert_eq!(year_ticks(&points, 5), vec![(2005, 1), (2010, 4)]);
        assert!(year_ticks(&[], 5).is_empty());
    }

    #[test]
    fn year_grid_adds_labelled_vertical_lines() {
        let points: Vec<_> = (0..6)
            .map(|i| (ymd(2000 + i, 1, 1), Some(1.0 + i as f64)))
            .collect();
        let svg = render_svg(&ChartSpec::new("EUR", points)).unwrap();
        assert_eq!(svg.matches("<line ").count(), VALUE_TICK_INTERVALS + 1 + 2);
        assert!(svg.contains(">2000</text>"));
        assert!(svg.contains(">2005</text>"));
    }

    #[test]
    fn labels_are_escaped() {
        let spec = ChartSpec::new("USD/EUR <weekly> & more", weekly(ymd(2020, 1, 1), &[Some(1.0)]))
            .with_caption(Some("Source: Bloomberg".into()));
        let svg = render_svg(&spec).unwrap();
        assert!(svg.contains("USD/EUR &lt;weekly&gt; &amp; more"));
        assert!(svg.contains("Source: Bloomberg"));
    }
}
