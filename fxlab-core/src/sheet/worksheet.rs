//! Worksheet part parsing into sparse rows.
//!
//! Row order follows the `<row>` elements. Within a row, cells are keyed by the
//! column decoded from their `r` attribute, so sparse or out-of-order
//! declarations still land in the right place. Densification happens later, in
//! `WorksheetGrid::from_sparse_rows`.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::cell_ref::{column_index, MAX_COLUMN};
use super::xml::{attr_value, XmlError};

/// One worksheet row as column offset → raw cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseRow {
    cells: BTreeMap<usize, String>,
}

impl SparseRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cell. A later declaration of the same column wins.
    pub fn insert(&mut self, column: usize, value: String) {
        self.cells.insert(column, value);
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(&column).map(String::as_str)
    }

    /// Highest occupied column offset, if any cell was declared.
    pub fn max_column(&self) -> Option<usize> {
        self.cells.keys().next_back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resolve into a fixed-width row, padding unset columns with `""`.
    ///
    /// Cells at or beyond `width` are dropped; callers size `width` from
    /// `max_column` so that never happens in practice.
    pub fn into_dense(self, width: usize) -> Vec<String> {
        let mut row = vec![String::new(); width];
        for (column, value) in self.cells {
            if let Some(slot) = row.get_mut(column) {
                *slot = value;
            }
        }
        row
    }
}

/// How a cell's text should be resolved, from its `t` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    SharedString,
    InlineString,
    Literal,
}

impl CellKind {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            _ => CellKind::Literal,
        }
    }
}

#[derive(Debug)]
struct PendingCell {
    column: usize,
    kind: CellKind,
    value: String,
    inline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    Value,
    InlineText,
}

/// Parse a worksheet part into sparse rows, resolving shared-string cells
/// against `shared`.
pub(crate) fn parse_worksheet(xml: &[u8], shared: &[String]) -> Result<Vec<SparseRow>, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut rows = Vec::new();
    let mut row: Option<SparseRow> = None;
    let mut cell: Option<PendingCell> = None;
    let mut capture = Capture::None;
    let mut in_inline = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Some(SparseRow::new()),
                b"c" if row.is_some() => match open_cell(&e)? {
                    Some(pending) => cell = Some(pending),
                    // Unaddressable cell: skip its whole subtree.
                    None => {
                        reader.read_to_end_into(e.name(), &mut Vec::new())?;
                    }
                },
                b"v" if cell.is_some() => capture = Capture::Value,
                b"is" if cell.is_some() => in_inline = true,
                b"rPh" if in_inline => phonetic_depth += 1,
                b"t" if in_inline && phonetic_depth == 0 => capture = Capture::InlineText,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => rows.push(SparseRow::new()),
                b"c" => {
                    if let (Some(r), Some(pending)) = (row.as_mut(), open_cell(&e)?) {
                        r.insert(pending.column, String::new());
                    }
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(pending) = cell.as_mut() {
                    match capture {
                        Capture::Value => pending.value.push_str(&t.unescape()?),
                        Capture::InlineText => pending.inline.push_str(&t.unescape()?),
                        Capture::None => {}
                    }
                }
            }
            Event::CData(t) => {
                if let Some(pending) = cell.as_mut() {
                    let text = String::from_utf8_lossy(&t);
                    match capture {
                        Capture::Value => pending.value.push_str(&text),
                        Capture::InlineText => pending.inline.push_str(&text),
                        Capture::None => {}
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = Capture::None,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"is" => in_inline = false,
                b"c" => {
                    if let Some(pending) = cell.take() {
                        let column = pending.column;
                        let value = resolve_cell(pending, shared)?;
                        if let Some(r) = row.as_mut() {
                            r.insert(column, value);
                        }
                    }
                    capture = Capture::None;
                    in_inline = false;
                    phonetic_depth = 0;
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        rows.push(r);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if row.is_some() || cell.is_some() {
        return Err(XmlError::Malformed(
            "unexpected end of document inside <row>".into(),
        ));
    }

    Ok(rows)
}

fn open_cell(element: &BytesStart<'_>) -> Result<Option<PendingCell>, XmlError> {
    let Some(reference) = attr_value(element, b"r")? else {
        return Ok(None);
    };
    let Some(column) = column_index(&reference) else {
        return Ok(None);
    };
    if column > MAX_COLUMN {
        return Err(XmlError::Malformed(format!(
            "cell reference '{reference}' is beyond column XFD"
        )));
    }
    let kind = CellKind::from_attr(attr_value(element, b"t")?.as_deref());
    Ok(Some(PendingCell {
        column,
        kind,
        value: String::new(),
        inline: String::new(),
    }))
}

fn resolve_cell(cell: PendingCell, shared: &[String]) -> Result<String, XmlError> {
    match cell.kind {
        CellKind::InlineString => Ok(cell.inline),
        CellKind::Literal => Ok(cell.value),
        CellKind::SharedString => {
            let raw = cell.value.trim();
            if raw.is_empty() {
                return Ok(String::new());
            }
            let index: usize = raw.parse().map_err(|_| {
                XmlError::Malformed(format!("invalid shared string index '{raw}'"))
            })?;
            shared.get(index).cloned().ok_or_else(|| {
                XmlError::Malformed(format!(
                    "shared string index {index} out of range ({} entries)",
                    shared.len()
                ))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Vec<String> {
        vec!["Date".into(), "EUR".into(), "JPY".into()]
    }

    #[test]
    fn resolves_each_cell_kind() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>GBP</t></is></c></row>
            <row r="2"><c r="A2"><v>36530</v></c><c r="B2" t="str"><v>1.2345678901234567</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &shared()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some("Date"));
        assert_eq!(rows[0].get(1), Some("GBP"));
        assert_eq!(rows[1].get(0), Some("36530"));
        assert_eq!(rows[1].get(1), Some("1.2345678901234567"));
    }

    #[test]
    fn out_of_order_cells_land_in_their_column() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="D1"><v>4</v></c><c r="B1"><v>2</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows[0].get(1), Some("2"));
        assert_eq!(rows[0].get(3), Some("4"));
        assert_eq!(rows[0].get(0), None);
        assert_eq!(rows[0].max_column(), Some(3));
    }

    #[test]
    fn cells_without_reference_are_skipped() {
        let xml = br#"<worksheet><sheetData>
            <row><c><v>lost</v></c><c r="B1"><v>kept</v></c></row>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows[0].get(1), Some("kept"));
        assert_eq!(rows[0].max_column(), Some(1));
    }

    #[test]
    fn empty_cell_elements_still_widen_the_row() {
        let xml = br#"<worksheet><sheetData>
            <row r="1"><c r="A1"><v>x</v></c><c r="E1" s="3"/></row>
            <row r="2"/>
        </sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(4), Some(""));
        assert!(rows[1].is_empty());
    }

    #[test]
    fn shared_index_out_of_range_is_malformed() {
        let xml = br#"<worksheet><sheetData><row><c r="A1" t="s"><v>9</v></c></row></sheetData></worksheet>"#;
        let err = parse_worksheet(xml, &shared()).unwrap_err();
        assert!(matches!(err, XmlError::Malformed(_)));
    }

    #[test]
    fn column_past_xfd_is_malformed() {
        let xml = br#"<worksheet><sheetData><row><c r="ZZZZZZZZZZ1"><v>1</v></c></row></sheetData></worksheet>"#;
        let err = parse_worksheet(xml, &[]).unwrap_err();
        assert!(matches!(err, XmlError::Malformed(ref m) if m.contains("ZZZZZZZZZZ1")));

        let xml = br#"<worksheet><sheetData><row><c r="XFD1"><v>1</v></c></row></sheetData></worksheet>"#;
        let rows = parse_worksheet(xml, &[]).unwrap();
        assert_eq!(rows[0].get(MAX_COLUMN), Some("1"));
    }

    #[test]
    fn into_dense_pads_with_empty_strings() {
        let mut row = SparseRow::new();
        row.insert(2, "c".into());
        assert_eq!(row.into_dense(4), vec!["", "", "c", ""]);
    }
}
