//! The Listing Parser (C2): extracts `(address, line)` pairs from listing
//! text, tokenizes a line at a cursor position, and recognizes function
//! labels.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
use std::sync::OnceLock;

use regex::Regex;

/// Delimiter characters substituted with spaces before tokenizing a line.
/// Matches the original's `delims` list exactly.
const DELIMS: &[char] = &['+', '-', '[', ']', ':', '{', '}', '*', ',', '(', ')'];

fn address_comment_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\s*EA:\s*(0x[0-9a-fA-F]+)\s*$")).as_ref().ok()
}

fn globl_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\.globl\s+([A-Za-z0-9_]+)")).as_ref().ok()
}

fn type_function_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\.type\s+([A-Za-z0-9_]+)\s*,\s*@function")).as_ref().ok()
}

fn label_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Za-z0-9_]+):\s*$")).as_ref().ok()
}

fn token_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\S+")).as_ref().ok()
}

/// Extracts `(address, line_index)` pairs from `lines`, sorted by address.
/// `line_index` is the 0-based index of the line within `lines`. Lines
/// without the `# EA: 0xHEX` marker are skipped.
pub fn extract_address_lines(lines: &[String]) -> Vec<(u64, usize)> {
    let mut out: Vec<(u64, usize)> = lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| {
            let caps = address_comment_regex()?.captures(line)?;
            let hex = caps.get(1)?.as_str();
            let addr = u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok()?;
            Some((addr, idx))
        })
        .collect();
    out.sort_by_key(|&(addr, _)| addr);
    out
}

/// Substitutes the fixed delimiter set with spaces, then returns the
/// maximal run of non-whitespace covering `char_pos`, inclusive at both
/// ends (a cursor sitting just past the last character of a token still
/// selects it). Returns an empty string if `char_pos` is out of bounds or
/// lands on whitespace.
pub fn tokenize_at(line_text: &str, char_pos: usize) -> String {
    let chars: Vec<char> = line_text.chars().collect();
    if char_pos > chars.len() {
        return String::new();
    }
    let replaced: String = chars.iter().map(|&c| if DELIMS.contains(&c) { ' ' } else { c }).collect();

    let Some(token_regex) = token_regex() else {
        return String::new();
    };
    for m in token_regex.find_iter(&replaced) {
        if char_pos >= m.start() && char_pos <= m.end() {
            return m.as_str().to_string();
        }
    }
    String::new()
}

/// Matches, in order, `.globl NAME`, `.type NAME, @function`, then a bare
/// `NAME:` label; returns the first hit. A regex that failed to compile is
/// treated as never matching.
pub fn parse_function_name(line_text: &str) -> Option<String> {
    if let Some(caps) = globl_regex().and_then(|re| re.captures(line_text)) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if let Some(caps) = type_function_regex().and_then(|re| re.captures(line_text)) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if let Some(caps) = label_regex().and_then(|re| re.captures(line_text)) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    None
}

/// Locates `needle` within `line`, returning `(start_char, end_char)`.
/// Character-based (not byte-based) to stay consistent with
/// [`tokenize_at`]'s cursor positions. Returns `None` if absent.
pub fn find_token_range(line: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }
    let haystack: Vec<char> = line.chars().collect();
    let target: Vec<char> = needle.chars().collect();
    if target.len() > haystack.len() {
        return None;
    }
    for start in 0..=(haystack.len() - target.len()) {
        if haystack[start..start + target.len()] == target[..] {
            return Some((start, start + target.len()));
        }
    }
    None
}

/// Searches backward from `line - 1` for the first `NAME:` label line,
/// aborting (returning `None`) if an `# EA:` instruction line is seen
/// first — meaning the search has walked into another instruction body
/// without finding the label.
pub fn preceding_function_line(lines: &[String], name: &str, line: usize) -> Option<usize> {
    let label = format!("{name}:");
    let address_comment_regex = address_comment_regex();
    let mut idx = line.checked_sub(1)?;
    loop {
        let current = lines.get(idx)?;
        if address_comment_regex.is_some_and(|re| re.is_match(current)) {
            return None;
        }
        if current.trim() == label {
            return Some(idx);
        }
        if idx == 0 {
            return None;
        }
        idx -= 1;
    }
}
