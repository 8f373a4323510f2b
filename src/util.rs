//! Text decoding and XML escaping helpers.

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Decode source bytes, rejecting malformed input.
///
/// With no label the bytes must be UTF-8. A byte order mark, if present,
/// overrides the label the same way browsers do and is stripped.
///
/// ```ignore
/// assert_eq!(decode_text(b"\xEF\xBB\xBFhi", None).unwrap(), "hi");
/// assert!(decode_text(b"\xFF\xFE\xFF", None).is_err());
/// ```
pub fn decode_text<'a>(bytes: &'a [u8], label: Option<&str>) -> Result<Cow<'a, str>> {
    let encoding = match label {
        Some(name) => Encoding::for_label(name.as_bytes())
            .ok_or_else(|| Error::UnknownEncoding(name.to_string()))?,
        None => encoding_rs::UTF_8,
    };

    let (text, used, malformed) = encoding.decode(bytes);
    if malformed {
        return Err(Error::MalformedText(used.name()));
    }
    Ok(text)
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}
