//! Small quick-xml helpers shared by the part parsers.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::BytesStart;
use thiserror::Error;

/// Failure while pulling events from one XML part.
///
/// Carries no path context; `extract_worksheet` attaches the source and part
/// name when converting into `SheetError::Parse`.
#[derive(Debug, Error)]
pub(crate) enum XmlError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid attribute: {0}")]
    Attr(#[from] AttrError),

    #[error("{0}")]
    Malformed(String),
}

/// Value of the attribute whose local name is `name`, unescaped.
pub(crate) fn attr_value(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, XmlError> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
