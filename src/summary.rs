//! Markdown summary template.
//!
//! The summary is a fixed three-part document built from the section map:
//! the abstract bucket verbatim, the results bucket turned into a bullet
//! list one line per bullet, and a placeholder for open questions.
//!
//! Bullets come from literal newline substitution, so a blank line inside
//! the results bucket renders as an empty `- ` item.

use crate::models::SectionMap;

const OPEN_QUESTIONS_PLACEHOLDER: &str = "- TODO: Add with model.";

/// Render the summary document for `filename`. Pure: no I/O, no clock.
pub fn assemble_summary(sections: &SectionMap, filename: &str) -> String {
    let abstract_text = sections.r#abstract.trim();
    let key_points = sections.results.trim().replace('\n', "\n- ");

    let mut out = String::new();
    out.push_str(&format!("# Summary of {}\n\n", filename));
    out.push_str(&format!("## Abstract\n{}\n\n", abstract_text));
    out.push_str(&format!("## Key Points\n- {}\n\n", key_points));
    out.push_str("## Open Questions\n");
    out.push_str(OPEN_QUESTIONS_PLACEHOLDER);
    out
}
