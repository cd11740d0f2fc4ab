//! Bullet repair for the "Main Points" section.
//!
//! Normalizes whatever list syntax the model produced (asterisks, bullet
//! glyphs, dashes, numbering, or a plain paragraph) to one hyphen-prefixed
//! item per line. Content is never reordered; an "Example:" item stays
//! wherever the model put it.

use std::sync::LazyLock;

use regex::Regex;

use crate::repair::{section_body_span, NEXT_HEADER_RE};
use crate::types::EMPTY_SECTION;

static MAIN_POINTS_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*2\.[ \t]*Main Points[ \t]*\r?$").unwrap());

static BULLET_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*\u{2022}\u{2013}\u{2014}]+\s+|\d+\s*[.)]\s+)").unwrap());

/// Strip one leading bullet or numbering marker (`-`, `*`, `•`, `–`, `—`,
/// `N.`, `N)`) from a line. Markers require trailing whitespace, so a
/// decimal like "3.5 grams" or a bold `**Term**` opener is left alone.
pub fn strip_bullet_marker(line: &str) -> &str {
    match BULLET_MARKER_RE.find(line) {
        Some(m) => &line[m.end()..],
        None => line.trim_start(),
    }
}

/// Split a paragraph into sentences. A sentence ends at `.`, `!`, or `?`
/// followed by whitespace and then an uppercase letter, digit, open
/// parenthesis, or a bullet glyph starting the next item. Avoids breaking on
/// abbreviations followed by lowercase continuations. Best effort.
pub fn split_sentences(paragraph: &str) -> Vec<String> {
    fn starts_new_sentence(c: char) -> bool {
        c.is_ascii_uppercase()
            || c.is_ascii_digit()
            || matches!(c, '(' | '\u{2022}' | '*' | '-' | '\u{2013}' | '\u{2014}')
    }

    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        // Require at least one whitespace char, then a sentence opener.
        let mut lookahead = paragraph[idx + c.len_utf8()..].char_indices();
        let Some((_, next)) = lookahead.next() else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }
        let after_ws = paragraph[idx + c.len_utf8()..]
            .char_indices()
            .find(|(_, ch)| !ch.is_whitespace());
        let Some((ws_end, opener)) = after_ws else {
            continue;
        };
        if starts_new_sentence(opener) {
            let sentence = paragraph[start..idx + c.len_utf8()].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = idx + c.len_utf8() + ws_end;
            // Skip the consumed whitespace in the outer iteration.
            while let Some(&(next_idx, _)) = chars.peek() {
                if next_idx < start {
                    chars.next();
                } else {
                    break;
                }
            }
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Repair bullet syntax within the "Main Points" body span. Text outside the
/// span is untouched; an empty or "N/A" body is left unchanged.
pub fn fix_main_points_bullets(text: &str) -> String {
    let Some((start, end)) = section_body_span(text, &MAIN_POINTS_HEADER_RE, &NEXT_HEADER_RE)
    else {
        return text.to_string();
    };

    let body = &text[start..end];
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(EMPTY_SECTION) {
        return text.to_string();
    }

    let normalized = body
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ");

    let mut items: Vec<String> = normalized
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    // A single unbulleted paragraph: re-split it at sentence boundaries.
    if items.len() == 1 {
        items = split_sentences(&items[0]);
    }

    let bullets: Vec<String> = items
        .iter()
        .map(|item| {
            let content = strip_bullet_marker(item).trim_end();
            format!("- {content}")
        })
        .collect();

    format!(
        "{}\n{}\n{}",
        &text[..start],
        bullets.join("\n"),
        &text[end..]
    )
}
