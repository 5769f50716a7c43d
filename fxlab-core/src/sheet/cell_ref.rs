//! A1-style cell reference decoding.
//!
//! Column letters are a 1-indexed bijective base-26 number (A=1 … Z=26,
//! AA=27 …). Everything in this crate works with 0-indexed column offsets.

/// Offset of column XFD, the last column a worksheet can hold.
pub const MAX_COLUMN: usize = 16_383;

/// Decode the column part of a cell reference (`"B7"`, `"AA12"`, `"c3"`) to a
/// 0-indexed column offset.
///
/// Only the leading run of ASCII letters is considered. Returns `None` when the
/// reference has no letters or the column would overflow `usize`.
pub fn column_index(reference: &str) -> Option<usize> {
    let letters = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase());

    let mut number: usize = 0;
    let mut seen = false;
    for letter in letters {
        seen = true;
        let digit = (letter - b'A' + 1) as usize;
        number = number.checked_mul(26)?.checked_add(digit)?;
    }

    if seen {
        Some(number - 1)
    } else {
        None
    }
}

/// Encode a 0-indexed column offset as spreadsheet column letters.
pub fn column_name(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
