//! Definition formatting for the "Helpful Definitions" section, plus the
//! document pre-pass used for PDF-style replies.

use std::sync::LazyLock;

use regex::Regex;

use crate::repair::bullets::strip_bullet_marker;
use crate::repair::headers::{header_patterns, match_header_line};
use crate::repair::{section_body_span, NEXT_HEADER_RE};
use crate::types::{EMPTY_SECTION, HEADER_DEFINITIONS, HEADER_MAIN_POINTS, HEADER_SUMMARY};

static DEFINITIONS_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*3\.[ \t]*Helpful Definitions[ \t]*\r?$").unwrap());

/// Longest term candidate accepted by the dash fallback. Guards against
/// mis-splitting a long unpunctuated sentence at an incidental dash.
const DASH_TERM_MAX_CHARS: usize = 120;

/// Split a line into (term, definition) at the first colon, falling back to
/// the first en/em dash or hyphen surrounded by spaces when the term
/// candidate is short enough. `None` when neither separator applies.
pub fn split_term_definition(line: &str) -> Option<(&str, &str)> {
    if let Some(pos) = line.find(':') {
        return Some((&line[..pos], &line[pos + 1..]));
    }

    let mut earliest: Option<(usize, usize)> = None;
    for sep in [" \u{2013} ", " \u{2014} ", " - "] {
        if let Some(pos) = line.find(sep) {
            if earliest.map_or(true, |(best, _)| pos < best) {
                earliest = Some((pos, sep.len()));
            }
        }
    }
    let (pos, sep_len) = earliest?;
    let term = &line[..pos];
    if term.chars().count() > DASH_TERM_MAX_CHARS {
        return None;
    }
    Some((term, &line[pos + sep_len..]))
}

/// Wrap a term in bold-emphasis markers, stripping enclosing bracket or
/// parenthesis artifacts first. A term already wrapped is left alone.
pub fn embolden_term(term: &str) -> String {
    let mut t = term.trim();
    t = t.strip_prefix('[').or_else(|| t.strip_prefix('(')).unwrap_or(t);
    t = t.strip_suffix(']').or_else(|| t.strip_suffix(')')).unwrap_or(t);
    t = t.trim();
    if t.len() >= 4 && t.starts_with("**") && t.ends_with("**") {
        return t.to_string();
    }
    let inner = t.trim_start_matches("**").trim_end_matches("**");
    format!("**{inner}**")
}

fn repair_line(line: &str) -> String {
    let raw = line.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(EMPTY_SECTION) {
        return line.to_string();
    }
    let no_lead = strip_bullet_marker(raw);
    let Some((term, definition)) = split_term_definition(no_lead) else {
        // No separator: best effort, leave the line alone.
        return line.to_string();
    };
    format!("- {}: {}", embolden_term(term), definition.trim_start())
}

/// Repair every line within the "Helpful Definitions" body span into the
/// `- **Term**: definition` form. Text outside the span is untouched.
pub fn fix_definitions_formatting(text: &str) -> String {
    let Some((start, end)) = section_body_span(text, &DEFINITIONS_HEADER_RE, &NEXT_HEADER_RE)
    else {
        return text.to_string();
    };

    let body = &text[start..end];
    let fixed: Vec<String> = body.split('\n').map(repair_line).collect();

    format!("{}{}{}", &text[..start], fixed.join("\n"), &text[end..])
}

/// Document pre-pass for PDF-style replies: tolerate headers rendered with
/// bold markup, trailing colons, or stray numerals; split the document into
/// the three bodies by header position; reassemble in canonical order with
/// "N/A" for any missing body. Output is already canonical, so running
/// `normalize_headers` afterward is a no-op.
pub fn normalize_document_sections(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();

    // First matching line per header, in document order.
    let mut found: Vec<(usize, usize, String)> = Vec::new();
    for (header_idx, (re, _)) in header_patterns().into_iter().enumerate() {
        for (line_no, line) in lines.iter().enumerate() {
            if found.iter().any(|&(l, _, _)| l == line_no) {
                continue;
            }
            if let Some(rest) = match_header_line(line, re) {
                found.push((line_no, header_idx, rest));
                break;
            }
        }
    }
    found.sort_by_key(|&(line_no, _, _)| line_no);

    let mut bodies: [Vec<String>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    // Content before the first recognized header belongs to the summary.
    let first_header_line = found.first().map(|&(l, _, _)| l).unwrap_or(lines.len());
    for line in &lines[..first_header_line] {
        bodies[0].push(line.to_string());
    }

    for (i, &(line_no, header_idx, ref rest)) in found.iter().enumerate() {
        let body_end = found
            .get(i + 1)
            .map(|&(next, _, _)| next)
            .unwrap_or(lines.len());
        if !rest.is_empty() {
            bodies[header_idx].push(rest.clone());
        }
        for line in &lines[line_no + 1..body_end] {
            bodies[header_idx].push(line.to_string());
        }
    }

    let render = |body: &[String]| -> String {
        let joined = body.join("\n");
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            EMPTY_SECTION.to_string()
        } else {
            trimmed.to_string()
        }
    };

    format!(
        "{HEADER_SUMMARY}\n{}\n\n{HEADER_MAIN_POINTS}\n{}\n\n{HEADER_DEFINITIONS}\n{}",
        render(&bodies[0]),
        render(&bodies[1]),
        render(&bodies[2]),
    )
}
