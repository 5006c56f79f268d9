//! Post-processing: deterministic text cleanup around the record synthesizers.
//!
//! Two entry points:
//!
//! - [`clean_source_text`] runs on extracted document text before either
//!   strategy sees it. Line endings are normalised so the product-block
//!   boundary (`\nProduct name:`) matches regardless of how the document was
//!   produced, and invisible characters that break keyword matching are
//!   dropped.
//! - [`clean_json_response`] runs on the raw string returned by the
//!   generation service before it is parsed. The JSON response-format hint is
//!   not a guarantee; models still wrap arrays in Markdown fences now and
//!   then.
//!
//! Each rule is a pure `&str → String` function and is tested on its own.

use once_cell::sync::Lazy;
use regex::Regex;

/// Cleanup applied to extracted document text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, word
///    joiners). ZWNJ and ZWJ are kept: they are part of the spelling of
///    Persian and Indic scripts and of emoji sequences.
pub fn clean_source_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    remove_invisible_chars(&s)
}

/// Cleanup applied to a generation response before JSON parsing.
///
/// Rules (applied in order):
/// 1. Normalise line endings (fence detection expects `\n`)
/// 2. Strip a leading BOM (a JSON syntax error). String values are left
///    alone, so joiners and other invisible characters inside answers survive.
/// 3. Strip an outer ```` ```json ```` fence
pub fn clean_json_response(input: &str) -> String {
    let s = normalise_line_endings(input);
    strip_json_fences(strip_leading_bom(&s))
}

// ── Rule: Normalise line endings ─────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule: Remove invisible Unicode characters ───────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{2060}'], "")
}

fn strip_leading_bom(input: &str) -> &str {
    input.trim_start_matches('\u{FEFF}')
}

// ── Rule: Strip outer code fences ────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n(.*)\n[ \t]*```\s*$").unwrap()
});

/// Returns the trimmed body of a fenced block, or the trimmed input when it
/// is not fenced.
fn strip_json_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}
