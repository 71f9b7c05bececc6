//! Boundary detection: independent pattern families scan the text for
//! header-like lines. Each match becomes one `SectionCandidate` with the
//! family's base confidence. Families may overlap on the same line; the
//! classifier resolves that.

use std::sync::LazyLock;

use regex::Regex;

use super::text::{bullet_marker_len, lines_with_offsets};
use crate::models::{PatternFamily, SectionCandidate, SectionKind, Span};
use crate::pipeline_config::DetectorConfidences;

/// Longest line considered a short header (colon-terminated, all-caps).
const MAX_SHORT_HEADER_CHARS: usize = 60;

/// Most words a short header may have.
const MAX_SHORT_HEADER_WORDS: usize = 6;

/// Longest emphasized or markdown title accepted.
const MAX_TITLE_CHARS: usize = 80;

static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}(#{1,6})\s+(.+?)\s*#*\s*$").unwrap());

static LEADING_EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\*\*|__)(.+?)(\*\*|__)(.*)$").unwrap());

type FamilyFn = fn(&str, &DetectorConfidences) -> Vec<SectionCandidate>;

/// Pattern families in their fixed reporting order.
const FAMILIES: [(PatternFamily, FamilyFn); 4] = [
    (PatternFamily::ExplicitHeader, explicit_headers),
    (PatternFamily::BoldEmphasis, bold_emphasis),
    (PatternFamily::ColonTerminated, colon_terminated),
    (PatternFamily::AllCaps, all_caps),
];

pub struct BoundaryDetector {
    confidences: DetectorConfidences,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::new(DetectorConfidences::default())
    }
}

impl BoundaryDetector {
    pub fn new(confidences: DetectorConfidences) -> Self {
        Self { confidences }
    }

    /// Scan `text` with every pattern family concurrently.
    /// Never fails; empty text yields no candidates.
    pub fn detect(&self, text: &str) -> Vec<SectionCandidate> {
        if text.is_empty() {
            return Vec::new();
        }
        let _span = tracing::debug_span!("detect_boundaries", bytes = text.len()).entered();

        let confidences = &self.confidences;
        let per_family: Vec<Vec<SectionCandidate>> = std::thread::scope(|scope| {
            let handles: Vec<_> = FAMILIES
                .iter()
                .map(|&(family, scan)| (family, scope.spawn(move || scan(text, confidences))))
                .collect();
            handles
                .into_iter()
                .map(|(family, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        tracing::error!(family = %family, "Boundary pattern family panicked");
                        Vec::new()
                    })
                })
                .collect()
        });

        let mut candidates: Vec<SectionCandidate> = per_family.into_iter().flatten().collect();
        // Stable: families keep their fixed order on equal starts.
        candidates.sort_by_key(|c| c.span.start);

        tracing::debug!(candidates = candidates.len(), "Boundary candidates detected");
        candidates
    }
}

/// Detect with default family confidences.
pub fn detect(text: &str) -> Vec<SectionCandidate> {
    BoundaryDetector::default().detect(text)
}

fn candidate(family: PatternFamily, confidence: f32, span: Span, title: String) -> SectionCandidate {
    SectionCandidate {
        kind: SectionKind::Unknown,
        confidence,
        span,
        title: Some(title),
        family,
    }
}

/// Strip emphasis markers, heading hashes and a trailing colon.
pub fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '*' | '_' | '#') || c.is_whitespace())
        .trim_end_matches(':')
        .trim()
        .to_string()
}

fn acceptable_title(title: &str, max_words: usize) -> bool {
    !title.is_empty()
        && title.chars().count() <= MAX_TITLE_CHARS
        && title.split_whitespace().count() <= max_words
        && title.chars().any(char::is_alphabetic)
}

/// Span of a line without its surrounding whitespace.
fn trimmed_span(line_start: usize, line: &str) -> Span {
    let lead = line.len() - line.trim_start().len();
    Span::new(line_start + lead, line_start + line.trim_end().len())
}

/// Markdown `#` headings.
fn explicit_headers(text: &str, conf: &DetectorConfidences) -> Vec<SectionCandidate> {
    lines_with_offsets(text)
        .filter_map(|(start, line)| {
            let caps = MARKDOWN_HEADING.captures(line)?;
            let title = clean_title(&caps[2]);
            acceptable_title(&title, 10).then(|| {
                candidate(
                    PatternFamily::ExplicitHeader,
                    conf.explicit_header,
                    trimmed_span(start, line),
                    title,
                )
            })
        })
        .collect()
}

/// `**Title**` or `__Title__` at the start of a line. The span covers the
/// emphasized text only, so trailing text on the line belongs to the body.
fn bold_emphasis(text: &str, conf: &DetectorConfidences) -> Vec<SectionCandidate> {
    lines_with_offsets(text)
        .filter_map(|(start, line)| {
            let caps = LEADING_EMPHASIS.captures(line)?;
            if caps[1] != caps[3] {
                return None;
            }
            let title = clean_title(&caps[2]);
            if !acceptable_title(&title, 8) {
                return None;
            }
            let rest = caps[4].trim().trim_start_matches(':').trim();
            let confidence = if rest.is_empty() {
                conf.bold_emphasis
            } else {
                conf.bold_inline
            };
            let close = caps.get(3)?;
            let lead = line.len() - line.trim_start().len();
            let mut end = close.end();
            // "**Title**:" keeps the colon in the header.
            if line[end..].starts_with(':') {
                end += 1;
            }
            Some(candidate(
                PatternFamily::BoldEmphasis,
                confidence,
                Span::new(start + lead, start + end),
                title,
            ))
        })
        .collect()
}

fn is_short_header_line(trimmed: &str) -> bool {
    !trimmed.is_empty()
        && trimmed.chars().count() <= MAX_SHORT_HEADER_CHARS
        && trimmed.split_whitespace().count() <= MAX_SHORT_HEADER_WORDS
        && bullet_marker_len(trimmed).is_none()
        && !trimmed.starts_with(['#', '*', '_', '>', '|'])
}

/// Short standalone lines ending in a colon.
fn colon_terminated(text: &str, conf: &DetectorConfidences) -> Vec<SectionCandidate> {
    lines_with_offsets(text)
        .filter_map(|(start, line)| {
            let trimmed = line.trim();
            if !trimmed.ends_with(':') || !is_short_header_line(trimmed) {
                return None;
            }
            let title = clean_title(trimmed);
            if title.contains(':') || !acceptable_title(&title, MAX_SHORT_HEADER_WORDS) {
                return None;
            }
            Some(candidate(
                PatternFamily::ColonTerminated,
                conf.colon_terminated,
                trimmed_span(start, line),
                title,
            ))
        })
        .collect()
}

/// Short lines whose letters are all uppercase.
fn all_caps(text: &str, conf: &DetectorConfidences) -> Vec<SectionCandidate> {
    lines_with_offsets(text)
        .filter_map(|(start, line)| {
            let trimmed = line.trim();
            if !is_short_header_line(trimmed) {
                return None;
            }
            let letters = trimmed.chars().filter(|c| c.is_alphabetic()).count();
            let all_upper = trimmed
                .chars()
                .filter(|c| c.is_alphabetic())
                .all(char::is_uppercase);
            if letters < 3 || !all_upper {
                return None;
            }
            let title = clean_title(trimmed);
            acceptable_title(&title, MAX_SHORT_HEADER_WORDS).then(|| {
                candidate(
                    PatternFamily::AllCaps,
                    conf.all_caps,
                    trimmed_span(start, line),
                    title,
                )
            })
        })
        .collect()
}
