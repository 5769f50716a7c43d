//! `xl/sharedStrings.xml` parsing.
//!
//! Each `<si>` entry becomes one logical string: the text of every `<t>` run,
//! concatenated in document order. Run formatting (`<rPr>`) carries no text and
//! is ignored; phonetic guides (`<rPh>`) are skipped so their `<t>` children do
//! not leak into the displayed value.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::xml::XmlError;

pub(crate) fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if current.is_some() && phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            Event::CData(t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    if let Some(s) = current.take() {
                        strings.push(s);
                    }
                }
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if current.is_some() {
        return Err(XmlError::Malformed("unexpected end of document inside <si>".into()));
    }

    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SST: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Date</t></si>
  <si><r><rPr><b/></rPr><t>EUR</t></r><r><t xml:space="preserve"> Curncy</t></r></si>
  <si><t>Base</t><rPh sb="0" eb="4"><t>PHO</t></rPh></si>
  <si/>
  <si><t>A &amp; B</t></si>
</sst>"#;

    #[test]
    fn concatenates_rich_text_runs() {
        let strings = parse_shared_strings(SST.as_bytes()).unwrap();
        assert_eq!(strings[0], "Date");
        assert_eq!(strings[1], "EUR Curncy");
    }

    #[test]
    fn skips_phonetic_runs() {
        let strings = parse_shared_strings(SST.as_bytes()).unwrap();
        assert_eq!(strings[2], "Base");
    }

    #[test]
    fn keeps_empty_entries_and_unescapes() {
        let strings = parse_shared_strings(SST.as_bytes()).unwrap();
        assert_eq!(strings.len(), 5);
        assert_eq!(strings[3], "");
        assert_eq!(strings[4], "A & B");
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = b"<sst><si><t>oops</si></sst>";
        assert!(parse_shared_strings(xml).is_err());
    }
}
