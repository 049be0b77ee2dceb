//! Keyword-triggered section splitter.
//!
//! Walks extracted text line by line. A line whose lowercased, trimmed form
//! contains one of the trigger substrings becomes a header: it switches the
//! current bucket and is not kept as content. Every other line is appended
//! (with a trailing `\n`) to the current bucket. Lines seen before the first
//! header are dropped.
//!
//! Triggers are checked in table order and the first hit wins, so a line
//! mentioning both "abstract" and "methods" is an abstract header. Matching
//! is plain substring containment with no word boundaries.

use crate::models::{Section, SectionMap};

/// Trigger substrings in priority order.
pub const TRIGGERS: [(&str, Section); 6] = [
    ("abstract", Section::Abstract),
    ("introduction", Section::Introduction),
    ("methods", Section::Methods),
    ("results", Section::Results),
    ("conclusion", Section::Conclusion),
    ("discussion", Section::Conclusion),
];

/// Classify a single line, returning the section it opens (if any).
pub fn classify_line(line: &str) -> Option<Section> {
    let lower = line.trim().to_lowercase();
    TRIGGERS
        .iter()
        .find(|(trigger, _)| lower.contains(trigger))
        .map(|&(_, section)| section)
}

/// Split document text into the five section buckets.
pub fn split_sections(text: &str) -> SectionMap {
    let mut sections = SectionMap::default();
    let mut current: Option<Section> = None;

    for line in lines(text) {
        if let Some(section) = classify_line(line) {
            current = Some(section);
        } else if let Some(section) = current {
            let bucket = sections.get_mut(section);
            bucket.push_str(line);
            bucket.push('\n');
        }
    }

    sections
}

/// Line boundaries: `\n`, `\r`, vertical tab, form feed, the file/group/
/// record separators, NEL, and the Unicode line and paragraph separators.
/// PDF extractors commonly emit form feeds between pages.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Iterate lines split on [`is_line_break`], with `\r\n` as one break.
///
/// A trailing break does not produce an extra empty line.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.char_indices().find(|&(_, c)| is_line_break(c)) {
            Some((pos, c)) => {
                let line = &rest[..pos];
                let width = if rest[pos..].starts_with("\r\n") {
                    2
                } else {
                    c.len_utf8()
                };
                rest = &rest[pos + width..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}
