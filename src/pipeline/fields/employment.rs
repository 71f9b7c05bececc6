use std::sync::LazyLock;

use regex::Regex;

use super::{section_lines, snippet};
use crate::models::{Document, EmploymentType, Field, Provenance, SectionKind};

const SEARCH_ORDER: [(SectionKind, f32); 4] = [
    (SectionKind::Metadata, 0.85),
    (SectionKind::Overview, 0.7),
    (SectionKind::Compensation, 0.7),
    (SectionKind::Unknown, 0.6),
];

/// Most specific arrangement first: a "full-time internship" is an internship.
static EMPLOYMENT_PATTERNS: LazyLock<Vec<(EmploymentType, Regex)>> = LazyLock::new(|| {
    [
        (EmploymentType::Internship, r"(?i)\b(?:internship|intern)\b"),
        (EmploymentType::Temporary, r"(?i)\b(?:temporary|temp|seasonal)\b"),
        (EmploymentType::Contract, r"(?i)\b(?:contract|contractor|freelance|1099)\b"),
        (EmploymentType::PartTime, r"(?i)\bpart[- ]?time\b"),
        (EmploymentType::FullTime, r"(?i)\b(?:full[- ]?time|permanent)\b"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

pub fn employment_type_of(text: &str) -> Option<EmploymentType> {
    EMPLOYMENT_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(kind, _)| *kind)
}

pub fn extract_employment_type(doc: &Document) -> Field<EmploymentType> {
    for (kind, confidence) in SEARCH_ORDER {
        for line in section_lines(doc, kind) {
            if let Some(value) = employment_type_of(line) {
                return Field::extracted(value, confidence, Provenance::pattern(kind, snippet(line)));
            }
        }
    }
    Field::absent()
}
