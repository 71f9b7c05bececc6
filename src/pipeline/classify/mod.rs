//! Section classification: score every boundary candidate against each
//! canonical kind, resolve overlapping candidates, and produce the
//! finalized, non-overlapping header layout of the document.

pub mod keywords;
pub mod scoring;

pub use keywords::*;
pub use scoring::*;

use serde::{Deserialize, Serialize};

use crate::models::{PatternFamily, Platform, SectionCandidate, SectionKind, Span};
use crate::pipeline_config::PipelineConfig;

/// A finalized section header with the body it governs. Body text is
/// attached by the assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSection {
    pub kind: SectionKind,
    pub title: String,
    pub header: Span,
    pub body: Span,
    pub confidence: f32,
    /// Accepted below threshold so a required kind is not left empty.
    pub low_confidence: bool,
    pub family: PatternFamily,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassifiedDocument {
    /// Sorted by header start; spans never overlap.
    pub sections: Vec<ClassifiedSection>,
    /// Text before the first finalized header, if any.
    pub preamble: Option<Span>,
}

struct Scored {
    candidate: SectionCandidate,
    scores: Vec<KindScore>,
    best: KindScore,
}

/// Classify boundary candidates against `text`.
///
/// Never fails: with no acceptable candidate the whole text becomes
/// preamble and every titled candidate is reported as `Unknown`.
pub fn classify(
    candidates: Vec<SectionCandidate>,
    text: &str,
    platform: Option<Platform>,
    config: &PipelineConfig,
) -> ClassifiedDocument {
    let _span = tracing::debug_span!(
        "classify_sections",
        candidates = candidates.len(),
        platform = platform.map(|p| p.as_str()).unwrap_or("none"),
    )
    .entered();

    if text.is_empty() {
        return ClassifiedDocument::default();
    }

    let weights = config.weights_for(platform);
    let mut starts: Vec<usize> = candidates.iter().map(|c| c.span.start).collect();
    starts.sort_unstable();

    let scored: Vec<Scored> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let body_end = starts
                .iter()
                .copied()
                .find(|s| *s >= candidate.span.end)
                .unwrap_or(text.len());
            let body = text.get(candidate.span.end..body_end).unwrap_or_default();
            let title = candidate.title.clone().unwrap_or_default();
            let position = candidate.span.start as f32 / text.len() as f32;
            let scores = score_kinds(&title, body, position, candidate.confidence, weights);
            let best = *best_kind(&scores)?;
            Some(Scored {
                candidate,
                scores,
                best,
            })
        })
        .collect();

    let survivors = resolve_overlaps(scored);

    let mut finalized: Vec<(SectionKind, f32, bool, SectionCandidate)> = Vec::new();
    let mut pending: Vec<Scored> = Vec::new();
    for s in survivors {
        if s.best.confidence >= config.acceptance_threshold {
            finalized.push((s.best.kind, s.best.confidence, false, s.candidate));
        } else {
            pending.push(s);
        }
    }

    // Required kinds with no accepted header take the best remaining
    // candidate carrying keyword evidence for that kind.
    for kind in SectionKind::REQUIRED {
        if finalized.iter().any(|(k, ..)| *k == kind) {
            continue;
        }
        let best = pending
            .iter()
            .enumerate()
            .map(|(i, s)| (i, keyword_for(&s.scores, kind)))
            .filter(|(_, kw)| *kw > 0.0)
            .fold(None, |best: Option<(usize, f32)>, (i, kw)| match best {
                Some((_, b)) if b >= kw => best,
                _ => Some((i, kw)),
            });
        if let Some((index, _)) = best {
            let s = pending.remove(index);
            let confidence = s
                .scores
                .iter()
                .find(|k| k.kind == kind)
                .map(|k| k.confidence)
                .unwrap_or(0.0);
            tracing::debug!(
                kind = %kind,
                confidence,
                "Accepted below-threshold header for required section"
            );
            finalized.push((kind, confidence, true, s.candidate));
        }
    }

    for s in pending {
        let titled = s.candidate.title.as_deref().is_some_and(has_title_evidence);
        if titled {
            finalized.push((SectionKind::Unknown, s.best.confidence, false, s.candidate));
        } else {
            tracing::trace!(start = s.candidate.span.start, "Folded untitled candidate into preceding section");
        }
    }

    finalized.sort_by_key(|(.., c)| c.span.start);

    let mut sections = Vec::with_capacity(finalized.len());
    for (i, (kind, confidence, low_confidence, candidate)) in finalized.iter().enumerate() {
        let body_end = finalized
            .get(i + 1)
            .map(|(.., next)| next.span.start)
            .unwrap_or(text.len());
        sections.push(ClassifiedSection {
            kind: *kind,
            title: candidate.title.clone().unwrap_or_default(),
            header: candidate.span,
            body: Span::new(candidate.span.end, body_end),
            confidence: *confidence,
            low_confidence: *low_confidence,
            family: candidate.family,
        });
    }

    let first_header = sections.first().map(|s| s.header.start).unwrap_or(text.len());
    let preamble = text
        .get(..first_header)
        .filter(|p| !p.trim().is_empty())
        .map(|_| Span::new(0, first_header));

    tracing::debug!(
        sections = sections.len(),
        has_preamble = preamble.is_some(),
        "Sections classified"
    );
    ClassifiedDocument { sections, preamble }
}

/// Cluster candidates with overlapping spans and keep one per cluster:
/// highest confidence, then earlier pattern family, then canonical kind.
fn resolve_overlaps(mut scored: Vec<Scored>) -> Vec<Scored> {
    scored.sort_by_key(|s| s.candidate.span.start);

    let mut clusters: Vec<Vec<Scored>> = Vec::new();
    let mut cluster_end = 0usize;
    for s in scored {
        match clusters.last_mut() {
            Some(cluster) if s.candidate.span.start < cluster_end => {
                cluster_end = cluster_end.max(s.candidate.span.end);
                cluster.push(s);
            }
            _ => {
                cluster_end = s.candidate.span.end;
                clusters.push(vec![s]);
            }
        }
    }

    clusters
        .into_iter()
        .filter_map(|cluster| {
            cluster.into_iter().reduce(|keep, s| {
                let better = s.best.confidence > keep.best.confidence
                    || (s.best.confidence == keep.best.confidence
                        && (s.candidate.family, s.best.kind.canonical_rank())
                            < (keep.candidate.family, keep.best.kind.canonical_rank()));
                if better {
                    s
                } else {
                    keep
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::boundary::detect;

    fn run(text: &str, platform: Option<Platform>) -> ClassifiedDocument {
        classify(detect(text), text, platform, &PipelineConfig::default())
    }

    fn kinds(doc: &ClassifiedDocument) -> Vec<SectionKind> {
        doc.sections.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn empty_input_yields_empty_classification() {
        let doc = run("", None);
        assert!(doc.sections.is_empty());
        assert!(doc.preamble.is_none());
    }

    #[test]
    fn inline_bold_labels_classified() {
        let text = "**Responsibilities:** Build things.\n**Qualifications:** 5 years experience.";
        let doc = run(text, None);
        assert_eq!(
            kinds(&doc),
            vec![SectionKind::Responsibilities, SectionKind::Qualifications]
        );
        assert!(doc.sections.iter().all(|s| !s.low_confidence));
        assert_eq!(&text[doc.sections[0].body.start..doc.sections[0].body.end], " Build things.\n");
        assert!(doc.preamble.is_none());
    }

    #[test]
    fn finalized_spans_do_not_overlap() {
        let text = "Senior Engineer\nAcme Corp\n\n## About the Role\nWe are seeking an engineer to join our team.\n\nRESPONSIBILITIES:\n- Build services\n- Own releases\n\n## Requirements\n- 5+ years of Rust\n\n## Benefits\n$150k - $180k per year, dental and vision.\n";
        let doc = run(text, Some(Platform::LinkedIn));
        assert_eq!(
            kinds(&doc),
            vec![
                SectionKind::Overview,
                SectionKind::Responsibilities,
                SectionKind::Qualifications,
                SectionKind::Compensation,
            ]
        );
        for pair in doc.sections.windows(2) {
            assert!(pair[0].body.end <= pair[1].header.start);
            assert!(!pair[0].header.overlaps(&pair[1].header));
        }
        let preamble = doc.preamble.unwrap();
        assert_eq!(&text[preamble.start..preamble.end], "Senior Engineer\nAcme Corp\n\n");
    }

    #[test]
    fn untitled_candidate_folds_into_previous_section() {
        let text = "## Responsibilities\n- Build services\nTech stack:\n- Rust\n- Postgres\n";
        let doc = run(text, Some(Platform::Indeed));
        assert_eq!(kinds(&doc), vec![SectionKind::Responsibilities]);
        let body = &text[doc.sections[0].body.start..doc.sections[0].body.end];
        assert!(body.contains("Tech stack:"));
        assert!(body.contains("Postgres"));
    }

    #[test]
    fn required_kind_below_threshold_is_kept_low_confidence() {
        let text = "## Responsibilities\n- Build services\n- Maintain pipelines\n";
        let strict = PipelineConfig {
            acceptance_threshold: 0.99,
            ..PipelineConfig::default()
        };
        let doc = classify(detect(text), text, None, &strict);
        assert_eq!(kinds(&doc), vec![SectionKind::Responsibilities]);
        let section = &doc.sections[0];
        assert!(section.low_confidence);
        assert!(section.confidence < strict.acceptance_threshold);
        assert!(section.confidence > 0.0);

        let relaxed = run(text, None);
        assert!(!relaxed.sections[0].low_confidence);
    }

    #[test]
    fn no_acceptable_candidate_yields_preamble_only() {
        let text = "We are hiring a barista for our downtown cafe.";
        let doc = run(text, None);
        assert!(doc.sections.is_empty());
        assert_eq!(doc.preamble, Some(Span::new(0, text.len())));
    }
}
