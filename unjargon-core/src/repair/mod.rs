//! Output-contract repair passes.
//!
//! The upstream model is instructed to emit exactly three numbered sections,
//! but its raw output deviates often enough that the contract is enforced
//! here: locate the three ordered section boundaries by pattern match, then
//! hand each bounded span to an independent line-oriented repair pass.

pub mod bullets;
pub mod definitions;
pub mod headers;

pub use bullets::fix_main_points_bullets;
pub use definitions::{fix_definitions_formatting, normalize_document_sections};
pub use headers::normalize_headers;

use std::sync::LazyLock;

use regex::Regex;

/// Start of any numbered header line, bounding the previous section's body.
pub(crate) static NEXT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]").unwrap());

/// Locate the body span following a header match: from the end of the header
/// line to the start of the next numbered header line, or end of text.
/// Returns byte offsets into `text`.
pub(crate) fn section_body_span(
    text: &str,
    header_re: &Regex,
    next_header_re: &Regex,
) -> Option<(usize, usize)> {
    let header = header_re.find(text)?;
    let tail = &text[header.end()..];
    let end = next_header_re
        .find(tail)
        .map(|m| header.end() + m.start())
        .unwrap_or(text.len());
    Some((header.end(), end))
}

/// Run the full repair pipeline on an accumulated model reply: header
/// normalization, bullet repair, then definition formatting.
pub fn repair_reply(text: &str) -> String {
    let normalized = normalize_headers(text);
    let bulleted = fix_main_points_bullets(&normalized);
    fix_definitions_formatting(&bulleted)
}

/// Repair pipeline for document-style replies (extracted PDF text): the
/// tolerant section pre-pass stands in for plain header normalization, then
/// the same span repairs run.
pub fn repair_document_reply(text: &str) -> String {
    let normalized = normalize_document_sections(text);
    let bulleted = fix_main_points_bullets(&normalized);
    fix_definitions_formatting(&bulleted)
}
