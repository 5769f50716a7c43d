//! FXLab Core: weekly FX rate extraction, change statistics and charts.
//!
//! This crate holds the pure parts of the pipeline:
//! - XLSX worksheet extraction to a grid of raw cell text (`sheet`)
//! - Rate table loading from CSV or an extracted grid (`data`)
//! - Percent / log week-over-week change series (`change`)
//! - Summary statistics and correlation matrices (`stats`)
//! - SVG line charts drawn from scratch (`chart`)
//!
//! Nothing here writes files; `fxlab-runner` owns output layout.

pub mod change;
pub mod chart;
pub mod data;
pub mod sheet;
pub mod stats;

pub use change::{compute_changes, ChangeFormula, ChangeSeries, ChangeTable};
pub use chart::{render_svg, ChartGeometry, ChartSpec, ChartStyle};
pub use data::{LoadError, LoadReport, Series, SeriesTable};
pub use sheet::{extract_worksheet, SheetError, WorksheetGrid};
pub use stats::{correlation_matrix, summarize, CorrelationMatrix, DateWindow, SummaryStats};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline values can cross rayon worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<WorksheetGrid>();
        require_sync::<WorksheetGrid>();
        require_send::<SeriesTable>();
        require_sync::<SeriesTable>();
        require_send::<ChangeTable>();
        require_sync::<ChangeTable>();
        require_send::<SummaryStats>();
        require_sync::<SummaryStats>();
        require_send::<CorrelationMatrix>();
        require_sync::<CorrelationMatrix>();
        require_send::<ChartSpec>();
        require_sync::<ChartSpec>();
        require_send::<SheetError>();
        require_send::<LoadError>();
    }
}
