use std::sync::LazyLock;

use regex::Regex;

use super::{clean_value, labelled_item, section_lines, snippet};
use crate::models::{Document, Field, LocationFlexibility, Provenance, SectionKind};

const LOCATION_LABELS: &[&str] = &[
    "location",
    "job location",
    "work location",
    "office location",
    "locations",
    "based in",
];

static CITY_STATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Z][a-zA-Z.]+(?:\s+[A-Z][a-zA-Z.]+){0,2},\s+[A-Z]{2})\b").unwrap()
});

/// Flexibility patterns in precedence order: the first family with a
/// match decides.
static FLEXIBILITY_PATTERNS: LazyLock<Vec<(LocationFlexibility, Regex)>> = LazyLock::new(|| {
    [
        (
            LocationFlexibility::FullyRemote,
            r"(?i)\b(?:fully[- ]remote|100% remote|remote[- ]first|remote[- ]only|work from anywhere|anywhere in the world)",
        ),
        (
            LocationFlexibility::RemoteAllowed,
            r"(?i)\b(?:remote|hybrid|work from home|wfh|telecommut\w*)\b",
        ),
        (
            LocationFlexibility::FlexibleRegion,
            r"(?i)\b(?:flexible location|(?:multiple|several|any of our) (?:locations|offices)|within (?:the )?\w+ (?:region|time ?zones?)|metro area)\b",
        ),
        (
            LocationFlexibility::Nationwide,
            r"(?i)\b(?:nationwide|anywhere in the (?:us|u\.s\.|united states|uk|country)|across the (?:us|country))\b",
        ),
    ]
    .into_iter()
    .map(|(flex, pattern)| (flex, Regex::new(pattern).unwrap()))
    .collect()
});

/// Location text: labelled item, else a "City, ST" mention.
pub fn extract_location(doc: &Document) -> Field<String> {
    if let Some((kind, item)) = labelled_item(
        doc,
        &[SectionKind::Metadata, SectionKind::Overview],
        LOCATION_LABELS,
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

    for kind in [SectionKind::Metadata, SectionKind::Overview] {
        for line in section_lines(doc, kind) {
            if let Some(caps) = CITY_STATE.captures(line) {
                return Field::extracted(caps[1].to_string(), 0.6, Provenance::pattern(kind, snippet(line)));
            }
        }
    }
    Field::absent()
}

/// Highest-precedence flexibility class matched by `text`, with the
/// matching line.
pub fn classify_flexibility(text: &str) -> Option<(LocationFlexibility, &str)> {
    FLEXIBILITY_PATTERNS.iter().find_map(|(flex, re)| {
        text.lines()
            .find(|line| re.is_match(line))
            .map(|line| (*flex, line.trim()))
    })
}

/// Whether `text` mentions remote work at all.
pub fn mentions_remote(text: &str) -> bool {
    matches!(
        classify_flexibility(text),
        Some((LocationFlexibility::FullyRemote | LocationFlexibility::RemoteAllowed, _))
    )
}

/// Confidence of `Fixed` when nothing in the posting speaks to flexibility.
const UNSTATED_CONFIDENCE: f32 = 0.2;

/// Work-location flexibility.
///
/// A location stated in Metadata is authoritative: the line it was read
/// from is classified and defaults to `Fixed`. Otherwise Metadata and
/// Overview are searched in that order. With no signal at all the value
/// is `Fixed` at low confidence and without provenance.
pub fn extract_flexibility(doc: &Document) -> Field<LocationFlexibility> {
    let location = extract_location(doc);
    if let Some(p) = location
        .provenance
        .as_ref()
        .filter(|p| p.section == SectionKind::Metadata)
    {
        let provenance = Provenance::pattern(SectionKind::Metadata, p.snippet.clone());
        return match classify_flexibility(&p.snippet) {
            Some((flex, _)) => Field::extracted(flex, 0.85, provenance),
            None => Field::extracted(LocationFlexibility::Fixed, 0.6, provenance),
        };
    }

    for (kind, confidence) in [(SectionKind::Metadata, 0.8), (SectionKind::Overview, 0.75)] {
        if let Some((flex, line)) = classify_flexibility(doc.body(kind)) {
            return Field::extracted(flex, confidence, Provenance::pattern(kind, snippet(line)));
        }
    }

    if let Some(p) = location.provenance {
        return Field::extracted(LocationFlexibility::Fixed, 0.5, p);
    }
    Field::defaulted(LocationFlexibility::Fixed, UNSTATED_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fields::tests::doc;

    #[test]
    fn precedence_checks_fully_remote_first() {
        assert_eq!(
            classify_flexibility("Remote - work from anywhere").map(|(f, _)| f),
            Some(LocationFlexibility::FullyRemote)
        );
        assert_eq!(
            classify_flexibility("Hybrid, 2 days in office").map(|(f, _)| f),
            Some(LocationFlexibility::RemoteAllowed)
        );
        assert_eq!(
            classify_flexibility("Open to candidates nationwide").map(|(f, _)| f),
            Some(LocationFlexibility::Nationwide)
        );
        assert_eq!(
            classify_flexibility("Any of our offices in the Bay Area").map(|(f, _)| f),
            Some(LocationFlexibility::FlexibleRegion)
        );
        assert_eq!(classify_flexibility("Austin, TX"), None);
    }

    #[test]
    fn overview_remote_without_location() {
        let d = doc(&[
            (SectionKind::Metadata, "Platform Engineer", &[]),
            (SectionKind::Overview, "Remote - work from anywhere. We ship weekly.", &[]),
        ]);
        let f = extract_flexibility(&d);
        assert_eq!(f.value, Some(LocationFlexibility::FullyRemote));
        assert_eq!(f.provenance.unwrap().section, SectionKind::Overview);
        assert!(!extract_location(&d).is_present());
    }

    #[test]
    fn metadata_location_defaults_to_fixed() {
        let d = doc(&[
            (SectionKind::Metadata, "Location: Austin, TX", &[("Location", "Austin, TX")]),
            (SectionKind::Overview, "This is a remote friendly team.", &[]),
        ]);
        assert_eq!(extract_location(&d).value.as_deref(), Some("Austin, TX"));
        assert_eq!(extract_flexibility(&d).value, Some(LocationFlexibility::Fixed));
    }

    #[test]
    fn metadata_remote_location() {
        let d = doc(&[(SectionKind::Metadata, "Location: Remote (US)", &[("Location", "Remote (US)")])]);
        let f = extract_flexibility(&d);
        assert_eq!(f.value, Some(LocationFlexibility::RemoteAllowed));
        assert!((f.confidence - 0.85).abs() < f32::EPSILON);
    }

    #[test]
    fn city_state_mention() {
        let d = doc(&[(SectionKind::Overview, "Our office is in San Francisco, CA near the bay.", &[])]);
        assert_eq!(extract_location(&d).value.as_deref(), Some("San Francisco, CA"));
        assert_eq!(extract_flexibility(&d).value, Some(LocationFlexibility::Fixed));
    }

    #[test]
    fn no_signal_defaults_to_fixed_without_provenance() {
        let d = doc(&[(SectionKind::Overview, "We build tools.", &[])]);
        let f = extract_flexibility(&d);
        assert_eq!(f.value, Some(LocationFlexibility::Fixed));
        assert!(f.provenance.is_none());
        assert!(!f.is_extracted());
        assert!(f.confidence < 0.5);
    }

    #[test]
    fn metadata_city_line_keeps_its_qualifier() {
        let d = doc(&[(
            SectionKind::Metadata,
            "Senior Engineer\nAcme Corp\nDenver, CO (Hybrid)",
            &[],
        )]);
        assert_eq!(extract_location(&d).value.as_deref(), Some("Denver, CO"));
        let f = extract_flexibility(&d);
        assert_eq!(f.value, Some(LocationFlexibility::RemoteAllowed));
        assert_eq!(f.provenance.unwrap().snippet, "Denver, CO (Hybrid)");
    }
}
