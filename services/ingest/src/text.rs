//! Text canonicalization applied to every export before parsing.

use std::borrow::Cow;

const BOM: char = '\u{feff}';

/// Decode raw export bytes.
///
/// Modern exports are UTF-8; the legacy AP system writes Windows-1252, so
/// anything that is not valid UTF-8 is decoded as such. The result is
/// already passed through [`normalize_text`].
pub fn decode_bytes(bytes: &[u8]) -> String {
    let decoded: Cow<'_, str> = match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            let (text, _had_errors) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    };
    normalize_text(&decoded)
}

/// Strip a leading BOM, collapse `\r\n` and lone `\r` to `\n`, drop NULs.
///
/// Total over any input, including the empty string.
pub fn normalize_text(raw: &str) -> String {
    let raw = raw.strip_prefix(BOM).unwrap_or(raw);
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\0' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            _ => out.push(c),
        }
    }

    out
}
