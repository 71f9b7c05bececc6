//! Text utilities shared by every stage: line walking with byte offsets,
//! indentation measurement, normalization and word-overlap similarity.

use std::collections::BTreeSet;

/// Iterate lines with the byte offset of their first character.
/// The trailing `\n` (and a preceding `\r`) is not part of the line.
pub fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0usize;
    text.split_inclusive('\n').map(move |raw| {
        let start = offset;
        offset += raw.len();
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let line = line.strip_suffix('\r').unwrap_or(line);
        (start, line)
    })
}

/// Indentation level = leading spaces / 2 + leading tabs, rounded down.
pub fn indentation_level(line: &str) -> usize {
    let mut spaces = 0usize;
    let mut tabs = 0usize;
    for c in line.chars() {
        match c {
            ' ' => spaces += 1,
            '\t' => tabs += 1,
            _ => break,
        }
    }
    spaces / 2 + tabs
}

/// Bullet marker length at the start of a trimmed line (`- `, `* `, `• `, `+ `, `1. `, `2) `).
pub fn bullet_marker_len(trimmed: &str) -> Option<usize> {
    let mut chars = trimmed.char_indices();
    let (_, first) = chars.next()?;
    if matches!(first, '-' | '*' | '•' | '+' | '–' | '·') {
        let after = first.len_utf8();
        return trimmed[after..]
            .starts_with([' ', '\t'])
            .then_some(after + 1);
    }
    if first.is_ascii_digit() {
        let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
        let rest = &trimmed[digits..];
        if (rest.starts_with(". ") || rest.starts_with(") ")) && digits <= 3 {
            return Some(digits + 2);
        }
    }
    None
}

pub fn is_bullet_line(line: &str) -> bool {
    bullet_marker_len(line.trim_start()).is_some()
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize_for_dedup(text: &str) -> String {
    let stripped: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Maximal alphanumeric runs, in order.
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

/// Lowercased distinct words.
pub fn word_set(text: &str) -> BTreeSet<String> {
    words(text).map(str::to_lowercase).collect()
}

/// Normalized word overlap (Jaccard). Two empty texts are identical.
pub fn word_overlap(a: &str, b: &str) -> f32 {
    let a = word_set(a);
    let b = word_set(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    shared as f32 / union as f32
}

/// Whole-word, case-insensitive containment of `phrase` in `text`.
/// Both sides are compared in normalized form.
pub fn contains_phrase(normalized_text: &str, normalized_phrase: &str) -> bool {
    if normalized_phrase.is_empty() {
        return false;
    }
    let haystack = format!(" {normalized_text} ");
    let needle = format!(" {normalized_phrase} ");
    haystack.contains(&needle)
}

/// Lines of `text` forming its first third (at least one non-empty line).
pub fn first_third_lines(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let take = lines.len().div_ceil(3);
    lines[..take].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_offsets_point_at_line_starts() {
        let text = "ab\r\ncd\n\nef";
        let lines: Vec<(usize, &str)> = lines_with_offsets(text).collect();
        assert_eq!(lines, vec![(0, "ab"), (4, "cd"), (7, ""), (8, "ef")]);
        for (offset, line) in lines {
            assert!(text[offset..].starts_with(line));
        }
    }

    #[test]
    fn indentation_counts_spaces_and_tabs() {
        assert_eq!(indentation_level("- a"), 0);
        assert_eq!(indentation_level("  - a"), 1);
        assert_eq!(indentation_level("   - a"), 1);
        assert_eq!(indentation_level("    - a"), 2);
        assert_eq!(indentation_level("\t- a"), 1);
        assert_eq!(indentation_level("\t  - a"), 2);
    }

    #[test]
    fn bullet_markers() {
        assert_eq!(bullet_marker_len("- item"), Some(2));
        assert_eq!(bullet_marker_len("• item"), Some(4));
        assert_eq!(bullet_marker_len("12. item"), Some(4));
        assert_eq!(bullet_marker_len("3) item"), Some(3));
        assert_eq!(bullet_marker_len("-item"), None);
        assert_eq!(bullet_marker_len("**bold**"), None);
        assert_eq!(bullet_marker_len("2024 was good"), None);
    }

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_for_dedup("  Build  APIs, fast! "), "build apis fast");
        assert_eq!(normalize_for_dedup("Build APIs fast"), "build apis fast");
        assert_eq!(normalize_for_dedup("***"), "");
    }

    #[test]
    fn overlap_is_jaccard() {
        assert_eq!(word_overlap("", ""), 1.0);
        assert_eq!(word_overlap("a b", ""), 0.0);
        assert!((word_overlap("Senior Engineer", "senior engineer") - 1.0).abs() < f32::EPSILON);
        assert!((word_overlap("a b", "b c") - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn phrase_containment_is_whole_word() {
        assert!(contains_phrase("about the company", "company"));
        assert!(!contains_phrase("companywide", "company"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn first_third_rounds_up() {
        assert_eq!(first_third_lines("a\nb\nc\nd"), "a\nb");
        assert_eq!(first_third_lines("only"), "only");
        assert_eq!(first_third_lines(""), "");
    }
}
