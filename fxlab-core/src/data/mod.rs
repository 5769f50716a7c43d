//! Rate table loading: cell parsing, the aligned series table, CSV/grid input.

pub mod loader;
pub mod parse;
pub mod table;

pub use loader::{find_date_column, load_series_csv, load_series_file, LoadError, LoadReport};
pub use parse::{excel_serial_to_date, parse_date, parse_rate};
pub use table::{Series, SeriesTable};
