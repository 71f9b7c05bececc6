//! Boilerplate removal: URLs are cut out of lines, copyright, social
//! call-to-action and cookie-notice lines are dropped whole.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ListItem;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)[^\s<>()\[\]]+").unwrap());

/// Patterns whose match discards the whole line.
static NOISE_LINES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // copyright
        r"(?i)^\s*(?:©|\(c\)|copyright\b)",
        r"(?i)\ball rights reserved\b",
        // social calls to action
        r"(?i)\b(?:follow us|like us on|connect with us|find us on|share this (?:job|post)|share on (?:facebook|twitter|linkedin|x))\b",
        // cookie notices
        r"(?i)\b(?:we use cookies|cookie policy|cookie settings|accept (?:all )?cookies)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub fn is_noise_line(line: &str) -> bool {
    NOISE_LINES.iter().any(|re| re.is_match(line))
}

/// Remove URL substrings from a single line.
pub fn strip_urls(line: &str) -> String {
    if !URL.is_match(line) {
        return line.to_string();
    }
    let stripped = URL.replace_all(line, "");
    // Collapse the gap left behind without touching indentation.
    let lead = stripped.len() - stripped.trim_start().len();
    let rest = stripped.trim_start().split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{}{}", &stripped[..lead], rest)
}

/// Drop noise lines and URLs from a block of text. Lines left empty by
/// URL removal disappear; blank separator lines are kept.
pub fn strip_noise(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        if is_noise_line(line) {
            continue;
        }
        let cleaned = strip_urls(line);
        if cleaned.trim().is_empty() && !line.trim().is_empty() {
            continue;
        }
        out.push(cleaned.trim_end().to_string());
    }
    out.join("\n")
}

/// Remove noise items (and their subtrees) and URLs from an item forest.
pub fn strip_item_noise(items: Vec<ListItem>) -> Vec<ListItem> {
    items
        .into_iter()
        .filter(|item| !is_noise_line(&item.label) && !is_noise_line(&item.description))
        .map(|mut item| {
            item.label = strip_urls(&item.label).trim().to_string();
            item.description = strip_urls(&item.description).trim().to_string();
            item.children = strip_item_noise(std::mem::take(&mut item.children));
            item
        })
        .filter(|item| !item.label.is_empty())
        .collect()
}
