//! Input normalization applied before boundary detection.
//!
//! Scraped postings arrive as HTML fragments, pasted text or PDF text with
//! stray control characters. Everything downstream (including the fidelity
//! check) works on the sanitized text. Leading indentation is preserved
//! because it drives list nesting.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Share of control/replacement characters above which input is not text.
const MAX_GARBAGE_RATIO: f32 = 0.30;

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:p|div|li|ul|ol|tr|section|article|header|footer)\s*>").unwrap()
});
static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:b|strong)(?:\s[^<>]*)?>").unwrap());
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[a-zA-Z][a-zA-Z0-9]*(?:\s[^<>]*)?/?>").unwrap());

/// Named and numeric entities seen in scraped postings.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&rsquo;", "\u{2019}"),
    ("&#8217;", "\u{2019}"),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&bull;", "•"),
    ("&euro;", "€"),
    ("&pound;", "£"),
    // Last so that "&amp;lt;" decodes to "&lt;" and not "<".
    ("&amp;", "&"),
];

/// Normalize raw posting text for the pipeline.
pub fn sanitize_input(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = remove_invisible_chars(&text);
    let text = if ANY_TAG.is_match(&text) {
        html_to_text(&text)
    } else {
        text
    };
    let text = decode_entities(&text);
    normalize_blank_lines(&text)
}

/// Empty, whitespace-only, or mostly non-text input.
pub fn is_unrecoverable(raw: &str) -> bool {
    let mut total = 0usize;
    let mut garbage = 0usize;
    for c in raw.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if (c.is_control() && c != '\t') || c == '\u{FFFD}' {
            garbage += 1;
        }
    }
    if total == 0 {
        return true;
    }
    garbage as f32 / total as f32 > MAX_GARBAGE_RATIO
}

/// Remove zero-width/formatting characters and C0/C1 controls,
/// keeping newlines and tabs.
fn remove_invisible_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            if *c == '\n' || *c == '\t' {
                return true;
            }
            if matches!(
                *c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}'..='\u{2064}' | '\u{FEFF}'
            ) {
                return false;
            }
            !c.is_control()
        })
        .collect()
}

fn html_to_text(text: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(2);
        let inner = ANY_TAG.replace_all(&caps[2], "");
        format!("\n{} {}\n", "#".repeat(level), inner.trim())
    });
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = LIST_ITEM.replace_all(&text, "\n- ");
    let text = BLOCK_END.replace_all(&text, "\n");
    let text = STRONG.replace_all(&text, "**");
    ANY_TAG.replace_all(&text, "").into_owned()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = text.to_string();
    for (entity, replacement) in ENTITIES {
        if out.contains(entity) {
            out = out.replace(entity, replacement);
        }
    }
    out
}

/// Trim trailing whitespace, collapse runs of blank lines, drop blank
/// lines at both ends. Leading indentation is kept.
fn normalize_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut prev_blank = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            if !prev_blank {
                lines.push("");
                prev_blank = true;
            }
        } else {
            lines.push(line);
            prev_blank = false;
        }
    }

    while lines.first() == Some(&"") {
        lines.remove(0);
    }
    while lines.last() == Some(&"") {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_keeps_indentation() {
        let raw = "- Design:\n  - UX: wireframes\n";
        assert_eq!(sanitize_input(raw), "- Design:\n  - UX: wireframes");
    }

    #[test]
    fn crlf_and_controls_removed() {
        let raw = "Title\r\nAcme\x00 Corp\u{200B}\r\n";
        assert_eq!(sanitize_input(raw), "Title\nAcme Corp");
    }

    #[test]
    fn blank_line_runs_collapse() {
        assert_eq!(sanitize_input("a\n\n\n\nb\n\n"), "a\n\nb");
    }

    #[test]
    fn html_headings_become_markdown() {
        let raw = "<h2>Responsibilities</h2><ul><li>Build: services</li><li>Own: releases</li></ul>";
        let clean = sanitize_input(raw);
        assert!(clean.contains("## Responsibilities"), "{clean}");
        assert!(clean.contains("- Build: services"), "{clean}");
        assert!(clean.contains("- Own: releases"), "{clean}");
        assert!(!clean.contains('<'));
    }

    #[test]
    fn html_bold_and_entities() {
        let raw = "<p><strong>Salary:</strong> $100k &ndash; $120k &amp; equity</p>";
        let clean = sanitize_input(raw);
        assert_eq!(clean, "**Salary:** $100k \u{2013} $120k & equity");
    }

    #[test]
    fn scripts_are_dropped() {
        let raw = "<div>Hello</div><script>var x = 1;</script>";
        assert_eq!(sanitize_input(raw), "Hello");
    }

    #[test]
    fn comparison_signs_are_not_tags() {
        let raw = "Team size < 10 and budget > 5";
        assert_eq!(sanitize_input(raw), raw);
    }

    #[test]
    fn escaped_entities_decode_once() {
        assert_eq!(sanitize_input("a &amp;lt; b"), "a &lt; b");
    }

    #[test]
    fn unrecoverable_inputs() {
        assert!(is_unrecoverable(""));
        assert!(is_unrecoverable("   \n\t  "));
        assert!(is_unrecoverable("\u{FFFD}\u{FFFD}\u{FFFD}ab"));
        assert!(!is_unrecoverable("Senior Engineer"));
    }
}
