//! Shared fixtures: in-memory XLSX packages built with the `zip` writer.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Date</t></si>
  <si><r><rPr><b/></rPr><t>EUR</t></r><r><t xml:space="preserve"> Curncy</t></r></si>
  <si><t>JPY Curncy</t></si>
  <si><t>(auto)</t></si>
</sst>"#;

/// Weekly EUR/JPY rates with a placeholder row, a gap, an out-of-order cell
/// declaration and a trailing inline-string column.
pub const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
    <row r="2"><c r="A2"><v>43831</v></c><c r="B2"><v>1.1213999999999999</v></c><c r="C2"><v>108.67</v></c></row>
    <row r="3"><c r="C3"><v>109.5</v></c><c r="A3"><v>43838</v></c><c r="B3"><v>1.1105</v></c></row>
    <row r="4"><c r="A4"><v>43845</v></c><c r="C4"><v>110.1</v></c></row>
    <row r="5"><c r="A5" t="s"><v>3</v></c><c r="B5"><v>1.2</v></c><c r="D5" t="inlineStr"><is><t>note</t></is></c></row>
  </sheetData>
</worksheet>"#;

pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn sample_xlsx() -> Vec<u8> {
    build_zip(&[
        ("[Content_Types].xml", "<Types/>"),
        ("xl/workbook.xml", "<workbook/>"),
        ("xl/sharedStrings.xml", SHARED_STRINGS),
        ("xl/worksheets/sheet1.xml", SHEET1),
    ])
}
