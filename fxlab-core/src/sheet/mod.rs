//! Spreadsheet cell extraction from XLSX containers.
//!
//! Reads one worksheet part (plus the optional shared-strings table) out of the
//! zip package and returns a `WorksheetGrid` of raw cell text. Values are kept
//! exactly as stored: no float parsing, no locale conversion.

pub mod cell_ref;
pub mod grid;
mod shared_strings;
pub mod worksheet;
mod xml;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use thiserror::Error;
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

pub use cell_ref::{column_index, column_name};
pub use grid::WorksheetGrid;
pub use worksheet::SparseRow;

/// Worksheet extracted when the caller does not name one.
pub const DEFAULT_WORKSHEET_PART: &str = "sheet1.xml";

const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEETS_DIR: &str = "xl/worksheets/";

/// Structural extraction failures. All are fatal for the call; no partial grid
/// is returned.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("failed to read {source_name}: {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("{source_name} is not a readable zip archive: {error}")]
    Archive {
        source_name: String,
        #[source]
        error: ZipError,
    },

    #[error("worksheet part '{part}' not found in {source_name}")]
    NotFound { source_name: String, part: String },

    #[error("malformed XML in '{part}' of {source_name}: {message}")]
    Parse {
        source_name: String,
        part: String,
        message: String,
    },
}

/// Extract one worksheet from the XLSX file at `path`.
///
/// `part` is either a bare file name (`"sheet1.xml"`) resolved under
/// `xl/worksheets/`, or a full part path.
pub fn extract_worksheet(path: &Path, part: &str) -> Result<WorksheetGrid, SheetError> {
    let source_name = path.display().to_string();
    let file = File::open(path).map_err(|error| SheetError::Io {
        source_name: source_name.clone(),
        error,
    })?;
    extract_worksheet_from_reader(BufReader::new(file), &source_name, part)
}

/// Extract one worksheet from any seekable XLSX byte source. `source_name` is
/// only used in error messages.
pub fn extract_worksheet_from_reader<R: Read + Seek>(
    reader: R,
    source_name: &str,
    part: &str,
) -> Result<WorksheetGrid, SheetError> {
    let mut archive = open_archive(reader, source_name)?;
    let part_name = worksheet_part_name(part);

    let shared = match read_part(&mut archive, SHARED_STRINGS_PART, source_name)? {
        Some(bytes) => shared_strings::parse_shared_strings(&bytes)
            .map_err(|e| parse_error(source_name, SHARED_STRINGS_PART, e))?,
        None => Vec::new(),
    };

    let sheet_xml = read_part(&mut archive, &part_name, source_name)?.ok_or_else(|| {
        SheetError::NotFound {
            source_name: source_name.to_string(),
            part: part_name.clone(),
        }
    })?;

    let rows = worksheet::parse_worksheet(&sheet_xml, &shared)
        .map_err(|e| parse_error(source_name, &part_name, e))?;
    let grid = WorksheetGrid::from_sparse_rows(rows);

    debug!(
        source = source_name,
        part = part_name.as_str(),
        shared_strings = shared.len(),
        columns = grid.column_count(),
        rows = grid.row_count(),
        "extracted worksheet"
    );

    Ok(grid)
}

/// List the worksheet parts (`xl/worksheets/*.xml`) in an XLSX file, sorted.
pub fn list_worksheet_parts(path: &Path) -> Result<Vec<String>, SheetError> {
    let source_name = path.display().to_string();
    let file = File::open(path).map_err(|error| SheetError::Io {
        source_name: source_name.clone(),
        error,
    })?;
    let archive = open_archive(BufReader::new(file), &source_name)?;

    let mut parts: Vec<String> = archive
        .file_names()
        .map(|name| name.trim_start_matches('/'))
        .filter(|name| {
            name.starts_with(WORKSHEETS_DIR)
                && name.ends_with(".xml")
                && !name[WORKSHEETS_DIR.len()..].contains('/')
        })
        .map(String::from)
        .collect();
    parts.sort();
    Ok(parts)
}

/// Resolve a user-supplied worksheet name to its part path.
pub fn worksheet_part_name(part: &str) -> String {
    let part = part.trim_start_matches('/');
    if part.contains('/') {
        part.to_string()
    } else {
        format!("{WORKSHEETS_DIR}{part}")
    }
}

fn open_archive<R: Read + Seek>(reader: R, source_name: &str) -> Result<ZipArchive<R>, SheetError> {
    ZipArchive::new(reader).map_err(|error| SheetError::Archive {
        source_name: source_name.to_string(),
        error,
    })
}

/// Read a part by exact name, falling back to a leading-slash variant.
/// `Ok(None)` means the part is absent.
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    source_name: &str,
) -> Result<Option<Vec<u8>>, SheetError> {
    let mut index = None;
    for (i, entry) in archive.file_names().enumerate() {
        if entry == name {
            index = Some(i);
            break;
        }
        if index.is_none() && entry.strip_prefix('/') == Some(name) {
            index = Some(i);
        }
    }
    let Some(index) = index else {
        return Ok(None);
    };

    let archive_error = |error: ZipError| SheetError::Archive {
        source_name: source_name.to_string(),
        error,
    };
    let mut file = archive.by_index(index).map_err(archive_error)?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).map_err(|error| SheetError::Io {
        source_name: source_name.to_string(),
        error,
    })?;
    Ok(Some(bytes))
}

fn parse_error(source_name: &str, part: &str, err: xml::XmlError) -> SheetError {
    SheetError::Parse {
        source_name: source_name.to_string(),
        part: part.to_string(),
        message: err.to_string(),
    }
}
