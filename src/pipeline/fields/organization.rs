use std::sync::LazyLock;

use regex::Regex;

use super::{clean_value, labelled_item, section_lines, snippet};
use crate::models::{Document, Field, Provenance, SectionKind};

const ORGANIZATION_LABELS: &[&str] = &[
    "company",
    "company name",
    "organization",
    "organisation",
    "employer",
    "hiring company",
];

/// Capitalized words that open sentences rather than name an employer.
const NOT_A_NAME: &[&str] = &["We", "Our", "The", "This", "You", "Your", "It", "Us"];

const NAME: &str = r"([A-Z][\w&.'-]*(?:\s+[A-Z][\w&.'-]*){0,3})";

static AT_OR_JOIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\b(?i:at|join)\s+{NAME}")).unwrap());

static NAME_IS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^{NAME}\s+(?:is|was|builds|helps|provides|makes)\b")).unwrap()
});

static CITY_STATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*[A-Z]{2}\b").unwrap());

fn plausible_name(name: &str) -> bool {
    let first = name.split_whitespace().next().unwrap_or_default();
    !name.is_empty() && !NOT_A_NAME.contains(&first)
}

/// Employer name: labelled item, the short line under the title in
/// Metadata, an "at X" / "join X" phrase, or "X is ..." in the company blurb.
pub fn extract_organization(doc: &Document) -> Field<String> {
    if let Some((kind, item)) = labelled_item(
        doc,
        &[
            SectionKind::Metadata,
            SectionKind::Overview,
            SectionKind::CompanyInfo,
        ],
        ORGANIZATION_LABELS,
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

    // Title on the first Metadata line, employer on the second.
    if let Some(line) = section_lines(doc, SectionKind::Metadata).nth(1) {
        let value = clean_value(line);
        let name_like = !line.contains(':')
            && !CITY_STATE.is_match(line)
            && value.split_whitespace().count() <= 5
            && value.chars().next().is_some_and(char::is_uppercase)
            && plausible_name(&value);
        if name_like {
            return Field::extracted(value, 0.6, Provenance::pattern(SectionKind::Metadata, snippet(line)));
        }
    }

    for kind in [SectionKind::Overview, SectionKind::CompanyInfo, SectionKind::Metadata] {
        for line in section_lines(doc, kind) {
            if let Some(caps) = AT_OR_JOIN.captures(line) {
                let value = clean_value(&caps[1]);
                if plausible_name(&value) {
                    return Field::extracted(value, 0.6, Provenance::pattern(kind, snippet(line)));
                }
            }
        }
    }

    for line in section_lines(doc, SectionKind::CompanyInfo) {
        if let Some(caps) = NAME_IS.captures(line) {
            let value = clean_value(&caps[1]);
            if plausible_name(&value) {
                return Field::extracted(value, 0.55, Provenance::pattern(SectionKind::CompanyInfo, snippet(line)));
            }
        }
    }

    Field::absent()
}
