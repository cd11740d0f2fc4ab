//! Canonical header normalization.
//!
//! Guarantees the three section headers exist exactly once, in order, each on
//! its own line. Only header labels are rewritten; section bodies are never
//! reordered.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{EMPTY_SECTION, HEADER_DEFINITIONS, HEADER_MAIN_POINTS, HEADER_SUMMARY};

/// Tolerant per-line pattern for one header label: optional bold markers,
/// optional leading ordinal, optional trailing colon/dash, optional trailing
/// same-line content.
fn header_regex(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)^\s*(?P<bo>\*\*)?\s*(?P<ord>\d+\s*[.)]\s*)?(?:{label})\s*(?P<bc>\*\*)?\s*(?P<sep>[:\-\u{{2013}}\u{{2014}}]+)?\s*(?P<bc2>\*\*)?\s*(?P<rest>.*?)\s*$"
    ))
    .unwrap()
}

static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| header_regex("Summary"));
static MAIN_POINTS_RE: LazyLock<Regex> = LazyLock::new(|| header_regex(r"Main\s+Points"));
static DEFINITIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| header_regex(r"Helpful\s+Definitions|Key\s+Definitions"));

pub(crate) fn header_patterns() -> [(&'static Regex, &'static str); 3] {
    [
        (&SUMMARY_RE, HEADER_SUMMARY),
        (&MAIN_POINTS_RE, HEADER_MAIN_POINTS),
        (&DEFINITIONS_RE, HEADER_DEFINITIONS),
    ]
}

/// Try to read `line` as a decorated header. Returns the same-line trailing
/// content on a match. A bare sentence that merely starts with the label word
/// does not match: some decoration (ordinal, bold, separator) is required
/// unless the line is the label alone.
pub(crate) fn match_header_line(line: &str, re: &Regex) -> Option<String> {
    let caps = re.captures(line)?;
    let decorated = caps.name("bo").is_some()
        || caps.name("bc").is_some()
        || caps.name("bc2").is_some()
        || caps.name("ord").is_some()
        || caps.name("sep").is_some();
    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
    if !decorated && !rest.is_empty() {
        return None;
    }
    Some(rest.to_string())
}

/// Normalize the three canonical headers in `text`.
///
/// Each header is searched for in order (a later header is only recognized
/// after the previous one), the first matching line is reduced to the
/// canonical literal, and same-line trailing content moves to the start of
/// the section body. Missing headers are synthesized: header 1 is prepended,
/// headers 2 and 3 are appended with an "N/A" body (header 2 is inserted
/// ahead of an already-present header 3 so the canonical order always
/// holds). Idempotent.
pub fn normalize_headers(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let mut found: [Option<usize>; 3] = [None; 3];
    let mut search_from = 0usize;

    for (idx, (re, canonical)) in header_patterns().into_iter().enumerate() {
        let mut line_no = search_from;
        while line_no < lines.len() {
            if let Some(rest) = match_header_line(&lines[line_no], re) {
                lines[line_no] = canonical.to_string();
                if !rest.is_empty() {
                    lines.insert(line_no + 1, rest);
                }
                // The moved trailing content stays eligible for the next
                // header search, keeping repeated runs stable.
                search_from = line_no + 1;
                found[idx] = Some(line_no);
                break;
            }
            line_no += 1;
        }
    }

    // Drop stray duplicates of a canonical header line so each appears once.
    let chosen: Vec<usize> = found.iter().flatten().copied().collect();
    let canonical_labels = [HEADER_SUMMARY, HEADER_MAIN_POINTS, HEADER_DEFINITIONS];
    let mut kept = Vec::with_capacity(lines.len());
    for (i, line) in lines.into_iter().enumerate() {
        if canonical_labels.contains(&line.trim()) && !chosen.contains(&i) {
            continue;
        }
        kept.push(line);
    }
    let mut lines = kept;

    // Recompute positions after the duplicate sweep.
    let position_of = |lines: &[String], label: &str| -> Option<usize> {
        lines.iter().position(|l| l.trim() == label)
    };

    if position_of(&lines, HEADER_SUMMARY).is_none() {
        lines.insert(0, HEADER_SUMMARY.to_string());
    }
    if position_of(&lines, HEADER_MAIN_POINTS).is_none() {
        match position_of(&lines, HEADER_DEFINITIONS) {
            // Keep canonical order when the definitions header already exists.
            Some(defs_pos) => {
                lines.insert(defs_pos, String::new());
                lines.insert(defs_pos, EMPTY_SECTION.to_string());
                lines.insert(defs_pos, HEADER_MAIN_POINTS.to_string());
            }
            None => {
                lines.push(String::new());
                lines.push(HEADER_MAIN_POINTS.to_string());
                lines.push(EMPTY_SECTION.to_string());
            }
        }
    }
    if position_of(&lines, HEADER_DEFINITIONS).is_none() {
        lines.push(String::new());
        lines.push(HEADER_DEFINITIONS.to_string());
        lines.push(EMPTY_SECTION.to_string());
    }

    lines.join("\n")
}
