//! Signals of the composite section score.

use std::sync::LazyLock;

use regex::Regex;

use super::keywords::{keywords_for, KindKeywords, KEYWORD_TABLE};
use crate::models::SectionKind;
use crate::pipeline::text::{contains_phrase, is_bullet_line, normalize_for_dedup};
use crate::pipeline_config::ClassifierWeights;

/// Score for an exact normalized title match.
const TITLE_EXACT: f32 = 1.0;
/// Score for a whole-word phrase inside a longer title.
const TITLE_CONTAINS: f32 = 0.8;
/// Single-word phrases shorter than this only match exactly.
const MIN_CONTAINED_PHRASE_LEN: usize = 6;
/// Distinct body keyword hits that saturate the body score.
const BODY_HITS_FOR_FULL_SCORE: f32 = 3.0;
const EXCLUSION_PENALTY: f32 = 0.3;
/// Share of the final confidence carried by the detector's base confidence.
const DETECTOR_SHARE: f32 = 0.15;

static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[$€£]\s?\d|\b\d+(?:\.\d+)?\s?k\b|\b(?:usd|eur|gbp|cad)\b|per hour|/\s?(?:hr|hour|year|yr)\b")
        .unwrap()
});

static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?](?:\s|$)").unwrap());

/// Per-kind breakdown of one candidate's score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindScore {
    pub kind: SectionKind,
    pub title: f32,
    /// Keyword signal (title and body).
    pub keyword: f32,
    pub structure: f32,
    pub position: f32,
    pub penalty: f32,
    /// Final confidence in [0, 1].
    pub confidence: f32,
}

/// Layout statistics of a candidate's body text.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyProfile {
    pub lines: usize,
    pub bullet_ratio: f32,
    pub avg_sentence_words: f32,
    pub avg_line_words: f32,
    pub has_money: bool,
}

impl BodyProfile {
    pub fn of(body: &str) -> Self {
        let lines: Vec<&str> = body.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.is_empty() {
            return Self::default();
        }
        let bullets = lines.iter().filter(|l| is_bullet_line(l)).count();
        let words = body.split_whitespace().count();
        let sentences = SENTENCE_END.find_iter(body).count().max(lines.len());
        Self {
            lines: lines.len(),
            bullet_ratio: bullets as f32 / lines.len() as f32,
            avg_sentence_words: words as f32 / sentences as f32,
            avg_line_words: words as f32 / lines.len() as f32,
            has_money: MONEY.is_match(body),
        }
    }
}

/// Title signal: exact phrase match, or whole-word containment of a
/// sufficiently specific phrase.
pub fn title_score(normalized_title: &str, table: &KindKeywords) -> f32 {
    if normalized_title.is_empty() {
        return 0.0;
    }
    let mut best = 0.0f32;
    for phrase in table.titles {
        let phrase = normalize_for_dedup(phrase);
        if phrase == normalized_title {
            return TITLE_EXACT;
        }
        let specific = phrase.len() >= MIN_CONTAINED_PHRASE_LEN || phrase.contains(' ');
        if specific && contains_phrase(normalized_title, &phrase) {
            best = TITLE_CONTAINS;
        }
    }
    best
}

/// Body signal: distinct keyword hits, saturating.
pub fn body_score(normalized_body: &str, table: &KindKeywords) -> f32 {
    let hits = table
        .body
        .iter()
        .filter(|kw| contains_phrase(normalized_body, &normalize_for_dedup(kw)))
        .count();
    (hits as f32 / BODY_HITS_FOR_FULL_SCORE).min(1.0)
}

/// Structural fit of a body to the layout typical of `kind`.
pub fn structure_score(kind: SectionKind, profile: &BodyProfile) -> f32 {
    if profile.lines == 0 {
        return 0.3;
    }
    let prose = (1.0 - profile.bullet_ratio) * (profile.avg_sentence_words / 12.0).min(1.0);
    match kind {
        SectionKind::Responsibilities | SectionKind::Qualifications => {
            0.4 + 0.6 * profile.bullet_ratio
        }
        SectionKind::Overview | SectionKind::CompanyInfo | SectionKind::LegalCompliance => {
            0.4 + 0.6 * prose
        }
        SectionKind::Compensation => {
            if profile.has_money {
                1.0
            } else {
                0.4 + 0.3 * profile.bullet_ratio
            }
        }
        SectionKind::Metadata => {
            if profile.avg_line_words <= 6.0 {
                0.9
            } else {
                0.4
            }
        }
        SectionKind::Unknown => 0.0,
    }
}

pub fn position_score(relative_position: f32, table: &KindKeywords) -> f32 {
    (1.0 - (relative_position - table.expected_position).abs()).clamp(0.0, 1.0)
}

/// Score a candidate against every canonical kind, in canonical order.
pub fn score_kinds(
    title: &str,
    body: &str,
    relative_position: f32,
    detector_confidence: f32,
    weights: &ClassifierWeights,
) -> Vec<KindScore> {
    let normalized_title = normalize_for_dedup(title);
    let normalized_body = normalize_for_dedup(body);
    let profile = BodyProfile::of(body);

    let titles: Vec<f32> = KEYWORD_TABLE
        .iter()
        .map(|t| title_score(&normalized_title, t))
        .collect();

    let weight_total = weights.keyword + weights.structure + weights.position;
    KEYWORD_TABLE
        .iter()
        .enumerate()
        .map(|(i, table)| {
            let title = titles[i];
            let keyword = 0.75 * title + 0.25 * body_score(&normalized_body, table);
            let structure = structure_score(table.kind, &profile);
            let position = position_score(relative_position, table);
            let best_other = titles
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, t)| *t)
                .fold(0.0f32, f32::max);
            let penalty = EXCLUSION_PENALTY * (best_other - title).max(0.0);
            let composite = (weights.keyword * keyword
                + weights.structure * structure
                + weights.position * position)
                / weight_total
                - penalty;
            let confidence = ((1.0 - DETECTOR_SHARE) * composite
                + DETECTOR_SHARE * detector_confidence)
                .clamp(0.0, 1.0);
            KindScore {
                kind: table.kind,
                title,
                keyword,
                structure,
                position,
                penalty,
                confidence,
            }
        })
        .collect()
}

/// Highest-confidence kind; ties resolve to the earlier canonical kind.
pub fn best_kind(scores: &[KindScore]) -> Option<&KindScore> {
    scores.iter().fold(None, |best: Option<&KindScore>, s| match best {
        Some(b) if b.confidence >= s.confidence => Some(b),
        _ => Some(s),
    })
}

/// Keyword evidence of one kind within a score vector.
pub fn keyword_for(scores: &[KindScore], kind: SectionKind) -> f32 {
    scores
        .iter()
        .find(|s| s.kind == kind)
        .map(|s| s.keyword)
        .unwrap_or(0.0)
}

/// Whether `title` names any canonical kind.
pub fn has_title_evidence(title: &str) -> bool {
    let normalized = normalize_for_dedup(title);
    SectionKind::CANONICAL_ORDER
        .iter()
        .filter_map(|k| keywords_for(*k))
        .any(|t| title_score(&normalized, t) > 0.0)
}
