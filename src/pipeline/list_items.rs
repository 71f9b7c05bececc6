//! Label/description extraction from bulleted content, with nesting
//! rebuilt from indentation.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{bullet_marker_len, indentation_level, lines_with_offsets};
use crate::models::{ItemPattern, ListItem, Span};

/// Longest label accepted by any item pattern.
const MAX_LABEL_CHARS: usize = 80;
/// Most words in a capitalized-colon label.
const MAX_CAPITALIZED_LABEL_WORDS: usize = 6;

static BOLD_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:[-*•+–·]|\d{1,3}[.)])\s+)?\*\*([^*]+?)(?::\*\*|\*\*\s*:)\s*(.*)$").unwrap()
});

static LABEL_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+?)\s*:(?:\s+(.*)|)$").unwrap());

/// One matched line, before hierarchy is rebuilt.
#[derive(Debug, Clone)]
struct FlatItem {
    label: String,
    description: String,
    confidence: f32,
    pattern: ItemPattern,
    span: Span,
    level: usize,
}

/// Arena node: children are indices into the arena.
struct Node {
    item: FlatItem,
    children: Vec<usize>,
}

impl ItemPattern {
    pub fn confidence(self) -> f32 {
        match self {
            ItemPattern::BoldLabelColon => 0.90,
            ItemPattern::BulletColon => 0.80,
            ItemPattern::CapitalizedColon => 0.70,
        }
    }
}

/// Extract the item tree of a section. `base_offset` is the absolute
/// position of `section_text` in the sanitized input; item spans are
/// reported in absolute offsets.
///
/// Text without colon-delimited structure yields no items.
pub fn extract_items(section_text: &str, base_offset: usize) -> Vec<ListItem> {
    let flat: Vec<FlatItem> = lines_with_offsets(section_text)
        .filter_map(|(start, line)| match_line(line, start + base_offset))
        .collect();
    if flat.is_empty() {
        return Vec::new();
    }
    build_tree(flat)
}

/// Best-scoring pattern for one line; at most one item per line.
fn match_line(line: &str, line_start: usize) -> Option<FlatItem> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let level = indentation_level(line);
    let lead = line.len() - line.trim_start().len();
    let span = Span::new(line_start + lead, line_start + lead + trimmed.len());

    let candidates = [
        bold_label(trimmed),
        bullet_colon(trimmed),
        capitalized_colon(trimmed),
    ];
    candidates
        .into_iter()
        .flatten()
        .max_by(|a, b| a.2.confidence().total_cmp(&b.2.confidence()))
        .map(|(label, description, pattern)| FlatItem {
            label,
            description,
            confidence: pattern.confidence(),
            pattern,
            span,
            level,
        })
}

fn acceptable_label(label: &str) -> bool {
    let lower = label.to_lowercase();
    !label.is_empty()
        && label.chars().count() <= MAX_LABEL_CHARS
        && label.chars().any(char::is_alphanumeric)
        && !lower.ends_with("http")
        && !lower.ends_with("https")
}

fn bold_label(trimmed: &str) -> Option<(String, String, ItemPattern)> {
    let caps = BOLD_LABEL.captures(trimmed)?;
    let label = caps[1].trim().trim_end_matches(':').trim().to_string();
    let description = caps[2].trim().to_string();
    acceptable_label(&label).then_some((label, description, ItemPattern::BoldLabelColon))
}

fn bullet_colon(trimmed: &str) -> Option<(String, String, ItemPattern)> {
    let marker = bullet_marker_len(trimmed)?;
    let rest = trimmed[marker..].trim_start();
    let caps = LABEL_COLON.captures(rest)?;
    let label = caps[1].trim().trim_matches('*').trim().to_string();
    let description = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default().to_string();
    acceptable_label(&label).then_some((label, description, ItemPattern::BulletColon))
}

fn capitalized_colon(trimmed: &str) -> Option<(String, String, ItemPattern)> {
    if bullet_marker_len(trimmed).is_some() || trimmed.starts_with(['#', '*', '_']) {
        return None;
    }
    let first = trimmed.chars().next()?;
    if !first.is_uppercase() {
        return None;
    }
    let caps = LABEL_COLON.captures(trimmed)?;
    let label = caps[1].trim().to_string();
    let description = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default().to_string();
    // A bare "Label:" line is a header, not an item.
    if description.is_empty() || label.split_whitespace().count() > MAX_CAPITALIZED_LABEL_WORDS {
        return None;
    }
    acceptable_label(&label).then_some((label, description, ItemPattern::CapitalizedColon))
}

/// Rebuild nesting with a parent stack over an index arena. An item
/// deeper than the stack top becomes its child; otherwise the stack is
/// popped until a shallower ancestor is found, else the item is a root.
fn build_tree(flat: Vec<FlatItem>) -> Vec<ListItem> {
    let mut arena: Vec<Node> = Vec::with_capacity(flat.len());
    let mut roots: Vec<usize> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();

    for item in flat {
        let index = arena.len();
        while let Some(&top) = stack.last() {
            if arena[top].item.level >= item.level {
                stack.pop();
            } else {
                break;
            }
        }
        match stack.last() {
            Some(&parent) => arena[parent].children.push(index),
            None => roots.push(index),
        }
        stack.push(index);
        arena.push(Node {
            item,
            children: Vec::new(),
        });
    }

    fn materialize(arena: &[Node], index: usize) -> ListItem {
        let node = &arena[index];
        ListItem {
            label: node.item.label.clone(),
            description: node.item.description.clone(),
            confidence: node.item.confidence,
            source_span: node.item.span,
            level: node.item.level,
            pattern: node.item.pattern,
            children: node
                .children
                .iter()
                .map(|child| materialize(arena, *child))
                .collect(),
        }
    }

    roots.iter().map(|root| materialize(&arena, *root)).collect()
}
