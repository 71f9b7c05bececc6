//! Field extraction: one extractor per field, run concurrently over the
//! assembled document, then cross-checked for consistency.

pub mod compensation;
pub mod consistency;
pub mod employment;
pub mod experience;
pub mod location;
pub mod organization;
pub mod title;

pub use compensation::*;
pub use consistency::*;
pub use employment::*;
pub use experience::*;
pub use location::*;
pub use organization::*;
pub use title::*;

use std::thread::ScopedJoinHandle;

use crate::models::{Document, Field, FieldName, FieldSet, ListItem, SectionKind, flatten_items};
use crate::pipeline::text::normalize_for_dedup;

/// Longest provenance snippet kept.
const MAX_SNIPPET_CHARS: usize = 160;

/// Extract every field from `doc`. Pure: the same document always yields
/// the same field set. A document without content yields no fields.
pub fn extract(doc: &Document) -> FieldSet {
    if doc.is_empty() {
        return FieldSet::empty();
    }
    let _span = tracing::debug_span!("extract_fields", sections = doc.sections.len()).entered();

    let mut fields = std::thread::scope(|scope| {
        let title = scope.spawn(|| extract_title(doc));
        let organization = scope.spawn(|| extract_organization(doc));
        let location = scope.spawn(|| extract_location(doc));
        let flexibility = scope.spawn(|| extract_flexibility(doc));
        let compensation = scope.spawn(|| extract_compensation(doc));
        let experience = scope.spawn(|| extract_experience(doc));
        let employment = scope.spawn(|| extract_employment_type(doc));

        FieldSet {
            title: joined(title, FieldName::Title),
            organization: joined(organization, FieldName::Organization),
            location: joined(location, FieldName::Location),
            location_flexibility: joined(flexibility, FieldName::LocationFlexibility),
            compensation: joined(compensation, FieldName::Compensation),
            experience: joined(experience, FieldName::Experience),
            employment_type: joined(employment, FieldName::EmploymentType),
            conflicts: Vec::new(),
        }
    });

    check_consistency(doc, &mut fields);

    tracing::debug!(
        extracted = FieldName::ALL.iter().filter(|f| fields.is_extracted(**f)).count(),
        conflicts = fields.conflicts.len(),
        "Fields extracted"
    );
    fields
}

/// A panicking extractor leaves its field absent.
fn joined<T>(handle: ScopedJoinHandle<'_, Field<T>>, name: FieldName) -> Field<T> {
    handle.join().unwrap_or_else(|_| {
        tracing::error!(field = %name, "Field extractor panicked");
        Field::absent()
    })
}

/// First item in `kinds` (searched in order, depth first) whose label is
/// one of `labels` and that carries a description.
pub(crate) fn labelled_item<'a>(
    doc: &'a Document,
    kinds: &[SectionKind],
    labels: &[&str],
) -> Option<(SectionKind, &'a ListItem)> {
    kinds.iter().find_map(|kind| {
        let section = doc.section(*kind)?;
        flatten_items(&section.items)
            .into_iter()
            .find(|item| {
                !item.description.trim().is_empty()
                    && labels.contains(&normalize_for_dedup(&item.label).as_str())
            })
            .map(|item| (*kind, item))
    })
}

/// Trimmed non-empty body lines of a section.
pub(crate) fn section_lines(doc: &Document, kind: SectionKind) -> impl Iterator<Item = &str> {
    doc.body(kind).lines().map(str::trim).filter(|l| !l.is_empty())
}

/// Strip markup and trailing punctuation from an extracted value.
pub(crate) fn clean_value(raw: &str) -> String {
    let markup = |c: char| matches!(c, '*' | '_' | '#' | '`') || c.is_whitespace();
    let trimmed = raw
        .trim()
        .trim_start_matches(['-', '•', '+'])
        .trim_matches(markup)
        .trim_end_matches([',', ';', '.', ':'])
        .trim_matches(markup);
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn snippet(line: &str) -> String {
    let line = line.trim();
    match line.char_indices().nth(MAX_SNIPPET_CHARS) {
        Some((cut, _)) => line[..cut].to_string(),
        None => line.to_string(),
    }
}
