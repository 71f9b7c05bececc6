use std::sync::LazyLock;

use regex::Regex;

use super::{section_lines, snippet};
use crate::models::{
    Document, Experience, ExperienceBasis, ExperienceLevel, Field, Provenance, SectionKind,
};

/// Confidence of the default `Mixed` level when nothing was found.
const DEFAULT_CONFIDENCE: f32 = 0.25;

const YEARS_SEARCH_ORDER: [SectionKind; 5] = [
    SectionKind::Qualifications,
    SectionKind::Overview,
    SectionKind::Responsibilities,
    SectionKind::Metadata,
    SectionKind::Unknown,
];

/// Metadata first: the title line carries seniority most reliably.
const LEVEL_SEARCH_ORDER: [(SectionKind, f32); 3] = [
    (SectionKind::Metadata, 0.6),
    (SectionKind::Overview, 0.5),
    (SectionKind::Qualifications, 0.5),
];

static YEAR_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s*(?:-|–|to)\s*(\d{1,2})\+?\s*(?:years?|yrs)\b").unwrap()
});

static YEAR_MIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\+?\s*(?:years?|yrs)\b").unwrap());

static EXPERIENCE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bexperience").unwrap());

/// Level keywords in precedence order.
static LEVEL_KEYWORDS: LazyLock<Vec<(ExperienceLevel, Regex)>> = LazyLock::new(|| {
    [
        (
            ExperienceLevel::Executive,
            r"(?i)\b(?:vp|vice president|director|head of|chief|cto|ceo|cfo|executive)\b",
        ),
        (
            ExperienceLevel::Senior,
            r"(?i)\b(?:senior|sr\.?|staff|principal|lead)\b",
        ),
        (
            ExperienceLevel::Entry,
            r"(?i)\b(?:entry[- ]level|junior|jr\.?|graduate|new grad|intern(?:ship)?)\b",
        ),
        (ExperienceLevel::Mid, r"(?i)\b(?:mid[- ]level|intermediate)\b"),
    ]
    .into_iter()
    .map(|(level, pattern)| (level, Regex::new(pattern).unwrap()))
    .collect()
});

/// Seniority implied by a minimum number of years.
pub fn level_for_years(min_years: u32) -> ExperienceLevel {
    match min_years {
        0..=1 => ExperienceLevel::Entry,
        2..=4 => ExperienceLevel::Mid,
        5..=9 => ExperienceLevel::Senior,
        _ => ExperienceLevel::Executive,
    }
}

/// Highest-precedence seniority keyword in `text`.
pub fn level_keyword(text: &str) -> Option<ExperienceLevel> {
    LEVEL_KEYWORDS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(level, _)| *level)
}

fn years_in(line: &str) -> Option<(u32, Option<u32>)> {
    if let Some(caps) = YEAR_RANGE.captures(line) {
        let a: u32 = caps[1].parse().ok()?;
        let b: u32 = caps[2].parse().ok()?;
        return Some((a.min(b), Some(a.max(b))));
    }
    let caps = YEAR_MIN.captures(line)?;
    Some((caps[1].parse().ok()?, None))
}

/// Experience requirement. Precedence: numeric years, then a level
/// keyword, then the `Mixed` default (kept at low confidence without
/// provenance, so it never counts as extracted).
pub fn extract_experience(doc: &Document) -> Field<Experience> {
    for kind in YEARS_SEARCH_ORDER {
        for line in section_lines(doc, kind) {
            let Some((min_years, max_years)) = years_in(line) else {
                continue;
            };
            let confidence = if EXPERIENCE_WORD.is_match(line) { 0.9 } else { 0.6 };
            let value = Experience {
                min_years: Some(min_years),
                max_years,
                level: level_for_years(min_years),
                basis: ExperienceBasis::NumericRange,
            };
            return Field::extracted(value, confidence, Provenance::pattern(kind, snippet(line)));
        }
    }

    for (kind, confidence) in LEVEL_SEARCH_ORDER {
        for line in section_lines(doc, kind) {
            if let Some(level) = level_keyword(line) {
                let value = Experience {
                    min_years: None,
                    max_years: None,
                    level,
                    basis: ExperienceBasis::LevelKeyword,
                };
                return Field::extracted(value, confidence, Provenance::pattern(kind, snippet(line)));
            }
        }
    }

    Field::defaulted(
        Experience {
            min_years: None,
            max_years: None,
            level: ExperienceLevel::Mixed,
            basis: ExperienceBasis::Default,
        },
        DEFAULT_CONFIDENCE,
    )
}
