use std::sync::LazyLock;

use regex::Regex;

use super::{clean_value, labelled_item, section_lines, snippet};
use crate::models::{Document, Field, Provenance, SectionKind};

const TITLE_LABELS: &[&str] = &["title", "job title", "position", "position title", "role"];

static HIRING_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?i:looking for|hiring|seeking)\s+(?:(?i:an?|the)\s+)?(?:(?i:experienced|talented|motivated)\s+)?([A-Z][\w+#./-]*(?:\s+[A-Z][\w+#./-]*){0,5})",
    )
    .unwrap()
});

/// Job title: labelled item, then the first title-like Metadata line,
/// then a "hiring a X" phrase in the Overview.
pub fn extract_title(doc: &Document) -> Field<String> {
    if let Some((kind, item)) = labelled_item(
        doc,
        &[SectionKind::Metadata, SectionKind::Overview],
        TITLE_LABELS,
    ) {
        let value = clean_value(&item.description);
        if !value.is_empty() {
            return Field::extracted(
                value,
                0.9,
                Provenance::pattern(kind, format!("{}: {}", item.label, item.description)),
            );
        }
    }

    if let Some(line) = section_lines(doc, SectionKind::Metadata).next() {
        let value = clean_value(line);
        let title_like = !line.contains(':')
            && !line.ends_with(['.', '!', '?'])
            && value.split_whitespace().count() <= 10
            && value.chars().count() <= 80;
        if title_like && !value.is_empty() {
            return Field::extracted(value, 0.7, Provenance::pattern(SectionKind::Metadata, snippet(line)));
        }
    }

    for line in section_lines(doc, SectionKind::Overview) {
        if let Some(caps) = HIRING_PHRASE.captures(line) {
            let value = clean_value(&caps[1]);
            if !value.is_empty() {
                return Field::extracted(value, 0.5, Provenance::pattern(SectionKind::Overview, snippet(line)));
            }
        }
    }

    Field::absent()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fields::tests::doc;

    #[test]
    fn labelled_title_wins() {
        let d = doc(&[(SectionKind::Metadata, "Acme Corp\nJob Title: Staff Engineer", &[("Job Title", "Staff Engineer")])]);
        let f = extract_title(&d);
        assert_eq!(f.value.as_deref(), Some("Staff Engineer"));
        assert!((f.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn first_metadata_line() {
        let d = doc(&[(SectionKind::Metadata, "**Senior Backend Engineer**\nAcme Corp", &[])]);
        let f = extract_title(&d);
        assert_eq!(f.value.as_deref(), Some("Senior Backend Engineer"));
        assert_eq!(f.provenance.unwrap().section, SectionKind::Metadata);
    }

    #[test]
    fn hiring_phrase_in_overview() {
        let d = doc(&[(SectionKind::Overview, "We are looking for a Data Engineer to join us.", &[])]);
        let f = extract_title(&d);
        assert_eq!(f.value.as_deref(), Some("Data Engineer"));
        assert!((f.confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn absent_without_evidence() {
        let d = doc(&[(SectionKind::Overview, "We build developer tools.", &[])]);
        let f = extract_title(&d);
        assert!(!f.is_present());
        assert_eq!(f.confidence, 0.0);
    }
}
