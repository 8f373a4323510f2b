//! Line classification for novel source text.

use regex::Regex;
use std::sync::LazyLock;

/// Volume heading: `第` + CJK numerals + `卷` at the start of the line.
static CHAPTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^第[一二三四五六七八九十百千零〇]+卷").unwrap());

/// Illustration marker anywhere in the line, e.g. `插圖 03` or `插圖３`.
static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"插圖\s*\d+").unwrap());

/// What a single source line means to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Empty after trimming; produces nothing.
    Blank,
    /// Opens a new chapter titled with the trimmed line.
    Chapter(&'a str),
    /// Inserts image `n`.
    Image(u32),
    /// Anything else, kept verbatim.
    Text(&'a str),
}

/// Classify one raw line.
///
/// Surrounding whitespace is trimmed first. Chapter markers win over image
/// markers, which win over plain text.
pub fn classify(raw: &str) -> LineKind<'_> {
    let line = raw.trim();
    if line.is_empty() {
        return LineKind::Blank;
    }

    if CHAPTER_RE.is_match(line) {
        return LineKind::Chapter(line);
    }

    if IMAGE_RE.is_match(line)
        && let Some(number) = line_number(line)
    {
        return LineKind::Image(number);
    }

    LineKind::Text(line)
}

/// Concatenate every decimal digit in the line and parse the result.
///
/// This reads the whole line, not just the marker, so `第3話 插圖5`
/// yields 35. Fullwidth digits count the same as ASCII ones. Returns
/// `None` when there are no such digits or they overflow `u32`.
fn line_number(line: &str) -> Option<u32> {
    let digits: String = line.chars().filter_map(decimal_digit).collect();
    digits.parse().ok()
}

/// Map an ASCII or fullwidth (`０`-`９`) digit to its ASCII form.
fn decimal_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        '０'..='９' => char::from_digit(c as u32 - '０' as u32, 10),
        _ => None,
    }
}
