//! Brief extraction from raw comment text.

/// Markers that open a comment line, longest first.
const OPENERS: [&str; 10] = [
    "///<", "//!<", "/**<", "/*!<", "///", "//!", "/**", "/*!", "//", "/*",
];

/// Derive the one-sentence summary of a raw comment.
///
/// An explicit `\brief` or `@brief` paragraph wins. Otherwise the first
/// paragraph is used, cut after its first sentence.
pub fn derive_brief(raw: &str) -> String {
    let lines = strip_decoration(raw);

    if let Some(brief) = explicit_brief(&lines) {
        return brief;
    }

    let paragraph: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .skip_while(|line| line.is_empty())
        .take_while(|line| !line.is_empty() && !is_command(line))
        .collect();
    first_sentence(&paragraph.join(" "))
}

/// Comment text with markers, leading `*` columns and closers removed.
pub fn strip_decoration(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let mut text = line.trim();
            if let Some(rest) = OPENERS.iter().find_map(|opener| text.strip_prefix(*opener)) {
                text = rest;
            }
            if let Some(rest) = text.strip_suffix("*/") {
                text = rest;
            }
            let text = text.trim();
            // Middle lines of a block comment
            let text = text
                .strip_prefix('*')
                .filter(|rest| !rest.starts_with('*'))
                .unwrap_or(text);
            text.trim().to_string()
        })
        .collect()
}

fn is_command(line: &str) -> bool {
    let mut chars = line.chars();
    matches!(chars.next(), Some('\\' | '@')) && chars.next().is_some_and(char::is_alphabetic)
}

fn explicit_brief(lines: &[String]) -> Option<String> {
    let start = lines.iter().position(|line| brief_content(line).is_some())?;
    let mut parts = Vec::new();
    if let Some(first) = brief_content(&lines[start]).filter(|text| !text.is_empty()) {
        parts.push(first);
    }
    parts.extend(
        lines[start + 1..]
            .iter()
            .map(String::as_str)
            .take_while(|line| !line.is_empty() && !is_command(line)),
    );
    Some(parts.join(" "))
}

fn brief_content(line: &str) -> Option<&str> {
    ["\\brief", "@brief"]
        .iter()
        .find_map(|marker| line.strip_prefix(*marker))
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .map(str::trim)
}

/// Text up to and including the first `.` that ends a sentence.
fn first_sentence(text: &str) -> String {
    let text = text.trim();
    let bytes = text.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte == b'.' && bytes.get(index + 1).is_none_or(u8::is_ascii_whitespace) {
            return text[..=index].to_string();
        }
    }
    text.to_string()
}
