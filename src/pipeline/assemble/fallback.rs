//! Fallback sources for required sections that were not detected.
//! Each required kind has a fixed list of sources, tried in order.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Section, SectionKind, SectionOrigin};
use crate::pipeline::text::{first_third_lines, is_bullet_line};

/// Confidence of fallback content relative to its source section.
const FALLBACK_CONFIDENCE_FACTOR: f32 = 0.5;

static QUALIFICATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:\d+\+?\s*(?:years?|yrs)|degree|bachelor'?s?|master'?s?|ph\.?d|required|requirement|proficien(?:t|cy)|certifi(?:ed|cation))\b",
    )
    .unwrap()
});

/// A way of deriving body text for one kind from another section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    FirstThird(SectionKind),
    BulletLines(SectionKind),
    QualificationLines(SectionKind),
}

impl Source {
    fn section(self) -> SectionKind {
        match self {
            Source::FirstThird(k) | Source::BulletLines(k) | Source::QualificationLines(k) => k,
        }
    }

    fn derive(self, body: &str) -> String {
        match self {
            Source::FirstThird(_) => first_third_lines(body),
            Source::BulletLines(_) => body
                .lines()
                .filter(|l| is_bullet_line(l))
                .collect::<Vec<_>>()
                .join("\n"),
            Source::QualificationLines(_) => body
                .lines()
                .filter(|l| QUALIFICATION_LINE.is_match(l))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Fallback source list per required kind. Preamble prose is handled
/// before fallbacks run, so it is not listed here.
fn sources(kind: SectionKind) -> &'static [Source] {
    match kind {
        SectionKind::Overview => &[
            Source::FirstThird(SectionKind::Responsibilities),
            Source::FirstThird(SectionKind::CompanyInfo),
        ],
        SectionKind::Responsibilities => &[Source::BulletLines(SectionKind::Overview)],
        SectionKind::Qualifications => &[
            Source::QualificationLines(SectionKind::Overview),
            Source::QualificationLines(SectionKind::Responsibilities),
            Source::QualificationLines(SectionKind::Unknown),
        ],
        _ => &[],
    }
}

/// Synthesize `kind` from the first source that yields text, else an
/// explicit placeholder.
pub fn synthesize(kind: SectionKind, existing: &[Section]) -> Section {
    for source in sources(kind) {
        let Some(from) = existing.iter().find(|s| s.kind == source.section()) else {
            continue;
        };
        let body = source.derive(&from.body);
        if body.trim().is_empty() {
            continue;
        }
        tracing::debug!(kind = %kind, from = %from.kind, "Synthesized section from fallback source");
        return Section {
            kind,
            title: kind.canonical_title().to_string(),
            body,
            items: Vec::new(),
            confidence: from.confidence * FALLBACK_CONFIDENCE_FACTOR,
            synthesized: true,
            low_confidence: true,
            origin: SectionOrigin::Fallback { from: from.kind },
            span: None,
        };
    }
    tracing::debug!(kind = %kind, "No fallback source, inserting placeholder");
    Section::placeholder(kind)
}
