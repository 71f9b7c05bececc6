//! Document assembly: merge classified sections and their item trees
//! into one ordered document with exactly one section per kind and every
//! required kind present.

pub mod fallback;
pub mod noise;

pub use fallback::*;
pub use noise::*;

use std::collections::BTreeSet;

use super::classify::{ClassifiedDocument, ClassifiedSection};
use super::list_items::extract_items;
use super::text::{lines_with_offsets, normalize_for_dedup};
use crate::models::{Document, ListItem, Section, SectionKind, SectionOrigin, Span};

/// Preamble lines that may go to Metadata.
const MAX_PREAMBLE_META_LINES: usize = 3;
const MAX_PREAMBLE_META_CHARS: usize = 80;
/// Confidence of a section built from preamble text.
const PREAMBLE_CONFIDENCE: f32 = 0.5;

/// Assemble the final document. `items` holds one item tree per
/// classified section, index-aligned with `classified.sections`.
pub fn assemble(text: &str, classified: &ClassifiedDocument, items: Vec<Vec<ListItem>>) -> Document {
    let _span = tracing::debug_span!("assemble_document", sections = classified.sections.len()).entered();

    let mut merged = merge_by_kind(text, &classified.sections, items);

    if let Some(preamble) = classified.preamble {
        attach_preamble(text, preamble, &mut merged);
    }

    for kind in SectionKind::REQUIRED {
        if !merged.iter().any(|s| s.kind == kind) {
            let section = fallback::synthesize(kind, &merged);
            merged.push(section);
        }
    }

    // Stable: equal ranks cannot occur after merging.
    merged.sort_by_key(|s| s.kind.canonical_rank());

    dedup_detected_lines(&mut merged);
    for section in &mut merged {
        section.items = dedup_sibling_labels(std::mem::take(&mut section.items));
    }

    tracing::debug!(
        sections = merged.len(),
        synthesized = merged.iter().filter(|s| s.synthesized).count(),
        "Document assembled"
    );
    Document { sections: merged }
}

/// Body text of a span: noise removed, surrounding blank lines dropped.
/// Text sharing the header's line loses its leading spaces.
fn clean_body(text: &str, span: Span) -> String {
    let Some(raw) = text.get(span.start..span.end) else {
        return String::new();
    };
    let stripped = strip_noise(raw);
    let mut lines: Vec<&str> = stripped.lines().collect();
    let inline = span.start > 0 && !text[..span.start].ends_with('\n');
    if inline {
        if let Some(first) = lines.first().copied() {
            lines[0] = first.trim_start();
        }
    }
    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn detected_section(text: &str, c: &ClassifiedSection, items: Vec<ListItem>) -> Section {
    Section {
        kind: c.kind,
        title: c.title.clone(),
        body: clean_body(text, c.body),
        items: strip_item_noise(items),
        confidence: c.confidence,
        synthesized: false,
        low_confidence: c.low_confidence,
        origin: SectionOrigin::Detected,
        span: Some(c.header),
    }
}

/// One section per kind. The highest-confidence instance supplies title,
/// confidence and flags; bodies and items are concatenated in detection order.
fn merge_by_kind(
    text: &str,
    sections: &[ClassifiedSection],
    mut items: Vec<Vec<ListItem>>,
) -> Vec<Section> {
    items.resize_with(sections.len(), Vec::new);
    let mut merged: Vec<Section> = Vec::new();

    for (c, section_items) in sections.iter().zip(items) {
        let incoming = detected_section(text, c, section_items);
        match merged.iter().position(|s| s.kind == incoming.kind) {
            None => merged.push(incoming),
            Some(index) => {
                let existing = &mut merged[index];
                tracing::debug!(kind = %incoming.kind, "Merging duplicate section");
                if incoming.confidence > existing.confidence {
                    existing.title = incoming.title;
                    existing.confidence = incoming.confidence;
                    existing.low_confidence = incoming.low_confidence;
                    existing.span = incoming.span;
                }
                existing.body = join_bodies(&existing.body, &incoming.body);
                existing.items.extend(incoming.items);
            }
        }
    }
    merged
}

fn join_bodies(first: &str, second: &str) -> String {
    match (first.trim().is_empty(), second.trim().is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{first}\n\n{second}"),
    }
}

/// Split preamble text: leading short title-like lines go to Metadata,
/// everything after to Overview. Existing sections get the text
/// prepended; missing ones are created from it.
fn attach_preamble(text: &str, preamble: Span, sections: &mut Vec<Section>) {
    let Some(raw) = text.get(preamble.start..preamble.end) else {
        return;
    };

    let mut meta_end = preamble.start;
    let mut meta_lines = 0usize;
    for (offset, line) in lines_with_offsets(raw) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if meta_lines > 0 {
                break;
            }
            continue;
        }
        let title_like = trimmed.chars().count() <= MAX_PREAMBLE_META_CHARS
            && !trimmed.ends_with(['.', '!', '?']);
        if !title_like || meta_lines == MAX_PREAMBLE_META_LINES {
            break;
        }
        meta_lines += 1;
        meta_end = preamble.start + offset + line.len();
    }

    let meta_span = Span::new(preamble.start, meta_end);
    let prose_span = Span::new(meta_end, preamble.end);
    let items = extract_items(raw, preamble.start);
    let (meta_items, prose_items): (Vec<ListItem>, Vec<ListItem>) = strip_item_noise(items)
        .into_iter()
        .partition(|item| item.source_span.start < meta_end);

    for (kind, span, items) in [
        (SectionKind::Metadata, meta_span, meta_items),
        (SectionKind::Overview, prose_span, prose_items),
    ] {
        let body = clean_body(text, span);
        if body.is_empty() && items.is_empty() {
            continue;
        }
        match sections.iter().position(|s| s.kind == kind) {
            Some(index) => {
                let existing = &mut sections[index];
                existing.body = join_bodies(&body, &existing.body);
                let mut combined = items;
                combined.append(&mut existing.items);
                existing.items = combined;
            }
            None => sections.push(Section {
                kind,
                title: kind.canonical_title().to_string(),
                body,
                items,
                confidence: PREAMBLE_CONFIDENCE,
                synthesized: true,
                low_confidence: false,
                origin: SectionOrigin::Preamble,
                span: None,
            }),
        }
    }
}

/// Drop body lines repeated across detected sections; the first
/// occurrence in document order is kept.
fn dedup_detected_lines(sections: &mut [Section]) {
    let mut ordered: Vec<usize> = (0..sections.len())
        .filter(|i| sections[*i].is_detected())
        .collect();
    ordered.sort_by_key(|i| sections[*i].span.map(|s| s.start).unwrap_or(usize::MAX));

    let mut seen: BTreeSet<String> = BTreeSet::new();
    for index in ordered {
        let section = &mut sections[index];
        let mut dropped = 0usize;
        let kept: Vec<&str> = section
            .body
            .lines()
            .filter(|line| {
                let normalized = normalize_for_dedup(line);
                if normalized.is_empty() || seen.insert(normalized) {
                    true
                } else {
                    dropped += 1;
                    false
                }
            })
            .collect();
        if dropped > 0 {
            tracing::debug!(kind = %section.kind, dropped, "Dropped repeated lines");
            section.body = kept.join("\n");
        }
    }
}

/// Remove siblings whose normalized label repeats an earlier sibling.
fn dedup_sibling_labels(items: Vec<ListItem>) -> Vec<ListItem> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(normalize_for_dedup(&item.label)))
        .map(|mut item| {
            item.children = dedup_sibling_labels(std::mem::take(&mut item.children));
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::boundary::detect;
    use crate::pipeline::classify::classify;
    use crate::pipeline_config::PipelineConfig;

    fn run(text: &str) -> Document {
        let classified = classify(detect(text), text, None, &PipelineConfig::default());
        let items = classified
            .sections
            .iter()
            .map(|s| {
                extract_items(&text[s.header.start..s.body.end], s.header.start)
            })
            .collect();
        assemble(text, &classified, items)
    }

    fn assert_one_per_required_kind(doc: &Document) {
        for kind in SectionKind::REQUIRED {
            assert_eq!(doc.sections.iter().filter(|s| s.kind == kind).count(), 1);
        }
    }

    #[test]
    fn empty_classification_gives_placeholders() {
        let doc = assemble("", &ClassifiedDocument::default(), Vec::new());
        assert_eq!(doc, Document::placeholders());
    }

    #[test]
    fn inline_labels_keep_items_and_synthesize_the_rest() {
        let text = "**Responsibilities:** Build things.\n**Qualifications:** 5 years experience.";
        let doc = run(text);
        assert_one_per_required_kind(&doc);
        assert_eq!(
            doc.kinds(),
            vec![
                SectionKind::Metadata,
                SectionKind::Overview,
                SectionKind::Responsibilities,
                SectionKind::Qualifications,
            ]
        );
        let resp = doc.section(SectionKind::Responsibilities).unwrap();
        assert_eq!(resp.body, "Build things.");
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].label, "Responsibilities");
        let qual = doc.section(SectionKind::Qualifications).unwrap();
        assert_eq!(qual.items[0].label, "Qualifications");
        assert!(doc.section(SectionKind::Metadata).unwrap().is_placeholder());
        assert_eq!(
            doc.section(SectionKind::Overview).unwrap().origin,
            SectionOrigin::Fallback {
                from: SectionKind::Responsibilities
            }
        );
    }

    #[test]
    fn preamble_split_between_metadata_and_overview() {
        let text = "Senior Engineer\nAcme Corp\n\nWe are seeking an engineer to join our platform team.\n\n## Responsibilities\n- Build services\n\n## Requirements\n- 5+ years of Rust\n";
        let doc = run(text);
        assert_one_per_required_kind(&doc);
        let meta = doc.section(SectionKind::Metadata).unwrap();
        assert_eq!(meta.body, "Senior Engineer\nAcme Corp");
        assert_eq!(meta.origin, SectionOrigin::Preamble);
        let overview = doc.section(SectionKind::Overview).unwrap();
        assert_eq!(overview.body, "We are seeking an engineer to join our platform team.");
    }

    #[test]
    fn duplicate_kinds_merge_into_one() {
        let text = "## Requirements\n- 5+ years of Rust\n\n## Responsibilities\n- Build services\n\n## Preferred Qualifications\n- Kubernetes experience\n";
        let doc = run(text);
        let quals: Vec<&Section> = doc
            .sections
            .iter()
            .filter(|s| s.kind == SectionKind::Qualifications)
            .collect();
        assert_eq!(quals.len(), 1);
        assert!(quals[0].body.contains("5+ years of Rust"));
        assert!(quals[0].body.contains("Kubernetes experience"));
    }

    #[test]
    fn repeated_lines_and_noise_removed() {
        let text = "## Responsibilities\n- Build services\nVisit https://acme.com/careers for more.\n\n## Requirements\n- Build services\n- 3 years of Go\n© 2024 Acme Inc.\n";
        let doc = run(text);
        let resp = doc.section(SectionKind::Responsibilities).unwrap();
        assert_eq!(resp.body, "- Build services\nVisit for more.");
        let qual = doc.section(SectionKind::Qualifications).unwrap();
        assert_eq!(qual.body, "- 3 years of Go");
    }

    #[test]
    fn sibling_labels_deduplicated() {
        let text = "## Skills\n- Rust: systems\n- rust: again\n- Go: services\n";
        let doc = run(text);
        let qual = doc.section(SectionKind::Qualifications).unwrap();
        let labels: Vec<&str> = qual.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["Rust", "Go"]);
    }
}
