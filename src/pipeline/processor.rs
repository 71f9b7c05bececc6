//! Pipeline orchestrator.
//!
//! Single entry point that drives one posting through every stage:
//! sanitize → detect boundaries → classify → list items → assemble →
//! extract fields → validate fidelity → (optional) oracle refinement.
//!
//! The oracle and the cache are injected, so the orchestrator stays fully
//! testable with mock implementations.

use serde::{Deserialize, Serialize};

use super::assemble::assemble;
use super::boundary::BoundaryDetector;
use super::cache::{cache_key, AnalysisCache};
use super::classify::{classify, ClassifiedDocument};
use super::fidelity;
use super::fields;
use super::list_items::extract_items;
use super::oracle::{self, InferenceOracle, OracleOutcome};
use super::sanitize::{is_unrecoverable, sanitize_input};
use crate::config::PIPELINE_VERSION;
use crate::models::{Document, FieldSet, ListItem, Platform, QualityReport, RawDocument};
use crate::pipeline_config::PipelineConfig;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Everything one analysis produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document: Document,
    pub fields: FieldSet,
    pub quality: QualityReport,
    pub oracle: OracleOutcome,
    pub pipeline_version: String,
}

impl AnalysisResult {
    /// Result for input that cannot be analyzed.
    fn unrecoverable(oracle: OracleOutcome) -> Self {
        Self {
            document: Document::placeholders(),
            fields: FieldSet::empty(),
            quality: QualityReport::unrecoverable(),
            oracle,
            pipeline_version: PIPELINE_VERSION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Stateless per call: concurrent `analyze` calls share only immutable
/// configuration and the optional cache.
pub struct Pipeline {
    config: PipelineConfig,
    detector: BoundaryDetector,
    oracle: Option<Box<dyn InferenceOracle>>,
    cache: Option<AnalysisCache>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            detector: BoundaryDetector::new(config.detector),
            config,
            oracle: None,
            cache: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Box<dyn InferenceOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Enable result memoization sized by the cache configuration.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(AnalysisCache::from_config(&self.config.cache));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&AnalysisCache> {
        self.cache.as_ref()
    }

    /// Analyze one posting. Never fails: unusable input yields placeholder
    /// sections and an all-zero quality report.
    pub fn analyze(&self, raw: &RawDocument) -> AnalysisResult {
        let _span = tracing::info_span!(
            "analyze",
            bytes = raw.text().len(),
            platform = raw.platform().map(|p| p.as_str()).unwrap_or("none"),
            prior = raw.platform().unwrap_or(Platform::Other).parse_confidence(),
        )
        .entered();

        let idle_oracle = || {
            if self.oracle.is_some() {
                OracleOutcome::Skipped
            } else {
                OracleOutcome::NotConfigured
            }
        };

        if is_unrecoverable(raw.text()) {
            tracing::warn!("Input unrecoverable, returning placeholder document");
            return AnalysisResult::unrecoverable(idle_oracle());
        }
        let text = sanitize_input(raw.text());
        if text.trim().is_empty() {
            tracing::warn!("Input empty after sanitization, returning placeholder document");
            return AnalysisResult::unrecoverable(idle_oracle());
        }

        let key = self.cache.as_ref().map(|_| cache_key(raw.platform(), &text));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                tracing::debug!("Analysis cache hit");
                return hit;
            }
        }

        let candidates = self.detector.detect(&text);
        let classified = classify(candidates, &text, raw.platform(), &self.config);
        let items = section_items(&text, &classified);
        let document = assemble(&text, &classified, items);
        let fields = fields::extract(&document);
        let quality = fidelity::validate(&text, &document, &fields, &self.config);

        let (fields, quality, oracle) = self.refine(&text, &document, fields, quality);

        tracing::info!(
            sections = document.sections.len(),
            overall = quality.overall,
            preservation = quality.preservation_ratio,
            analyzable = quality.analyzable,
            "Analysis complete"
        );

        let result = AnalysisResult {
            document,
            fields,
            quality,
            oracle,
            pipeline_version: PIPELINE_VERSION.to_string(),
        };
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, result.clone());
        }
        result
    }

    /// Convenience wrapper for text without a platform hint.
    pub fn analyze_text(&self, text: &str) -> AnalysisResult {
        self.analyze(&RawDocument::new(text))
    }

    /// Offer weak fields to the oracle. Any failure, and any refinement
    /// that makes the output less faithful, falls back to the input.
    fn refine(
        &self,
        text: &str,
        document: &Document,
        fields: FieldSet,
        quality: QualityReport,
    ) -> (FieldSet, QualityReport, OracleOutcome) {
        let Some(client) = self.oracle.as_deref() else {
            return (fields, quality, OracleOutcome::NotConfigured);
        };

        let (refined, outcome) = oracle::refine(client, text, document, &fields, &self.config.oracle);
        if !matches!(outcome, OracleOutcome::Accepted { .. }) {
            return (fields, quality, outcome);
        }

        let revalidated = fidelity::validate(text, document, &refined, &self.config);
        if revalidated.hallucination_detected && !quality.hallucination_detected {
            tracing::warn!("Refined fields failed fidelity validation, reverting");
            return (
                fields,
                quality,
                OracleOutcome::Rejected {
                    reason: "refined fields failed fidelity validation".into(),
                },
            );
        }
        (refined, revalidated, outcome)
    }
}

/// List items of every classified section, header line included so that
/// inline bold labels become items.
fn section_items(text: &str, classified: &ClassifiedDocument) -> Vec<Vec<ListItem>> {
    classified
        .sections
        .iter()
        .map(|s| {
            let slice = text.get(s.header.start..s.body.end).unwrap_or_default();
            extract_items(slice, s.header.start)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExperienceLevel, FieldOrigin, LocationFlexibility, Platform, SectionKind, SectionOrigin,
    };
    use crate::pipeline::oracle::{FailingOracle, MockOracle};

    const POSTING: &str = "Senior Backend Engineer\n\
Acme Corp\n\
\n\
## About the role\n\
We are looking for an engineer to join our platform team. Hybrid in Denver, CO.\n\
\n\
## Responsibilities\n\
- Design: own service architecture\n\
  - APIs: define contracts with partner teams\n\
- Operate production systems\n\
\n\
## Qualifications\n\
- 6+ years of experience with Rust or Go\n\
- Strong SQL skills\n\
\n\
## Compensation\n\
$150,000 - $180,000 per year, full-time\n";

    #[test]
    fn scenario_inline_bold_labels() {
        let result = Pipeline::default()
            .analyze_text("**Responsibilities:** Build things.\n**Qualifications:** 5 years experience.");
        let doc = &result.document;

        let detected: Vec<SectionKind> = doc
            .sections
            .iter()
            .filter(|s| s.is_detected())
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            detected,
            vec![SectionKind::Responsibilities, SectionKind::Qualifications]
        );

        let resp = doc.section(SectionKind::Responsibilities).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].label, "Responsibilities");
        let qual = doc.section(SectionKind::Qualifications).unwrap();
        assert_eq!(qual.items.len(), 1);
        assert_eq!(qual.items[0].label, "Qualifications");

        let experience = result.fields.experience.value.unwrap();
        assert_eq!(experience.min_years, Some(5));
    }

    #[test]
    fn scenario_empty_input() {
        let result = Pipeline::default().analyze_text("");
        assert_eq!(result.document.sections.len(), SectionKind::REQUIRED.len());
        assert!(result.document.sections.iter().all(|s| s.is_placeholder()));
        assert_eq!(result.quality.overall, 0.0);
        assert_eq!(result.quality.field_completeness_score, 0.0);
        assert!(!result.quality.analyzable);
        assert_eq!(result.oracle, OracleOutcome::NotConfigured);
    }

    #[test]
    fn markup_only_input_is_unrecoverable() {
        let result = Pipeline::default().analyze_text("<div><br></div>");
        assert!(result.document.sections.iter().all(|s| s.is_placeholder()));
        assert_eq!(result.quality.overall, 0.0);
    }

    #[test]
    fn scenario_remote_overview_without_location() {
        let text = "## About the role\n\
Remote - work from anywhere. You will build data pipelines.\n\
\n\
## Qualifications\n\
- 3 years of Python\n";
        let result = Pipeline::default().analyze_text(text);
        assert!(!result.fields.location.is_present());
        assert_eq!(
            result.fields.location_flexibility.value,
            Some(LocationFlexibility::FullyRemote)
        );
    }

    #[test]
    fn metadata_location_qualifier_sets_flexibility() {
        let text = "Senior Engineer\nAcme Corp\nDenver, CO (Hybrid)\n\n\
## Responsibilities\n- Build services\n\n## Qualifications\n- 5 years of Go\n";
        let result = Pipeline::default().analyze_text(text);
        assert_eq!(result.fields.location.value.as_deref(), Some("Denver, CO"));
        assert_eq!(
            result.fields.location_flexibility.value,
            Some(LocationFlexibility::RemoteAllowed)
        );
    }

    #[test]
    fn unstated_flexibility_is_fixed_but_not_counted() {
        let text = "Senior Engineer\nAcme Corp\n\n\
## Responsibilities\n- Build services\n\n## Qualifications\n- 5 years of Go\n";
        let result = Pipeline::default().analyze_text(text);
        let flex = &result.fields.location_flexibility;
        assert_eq!(flex.value, Some(LocationFlexibility::Fixed));
        assert!(flex.provenance.is_none());
        assert!(!result.fields.is_extracted(crate::models::FieldName::LocationFlexibility));
    }

    #[test]
    fn scenario_nested_bullets() {
        let result =
            Pipeline::default().analyze_text("## Responsibilities\n- Design:\n  - UX: wireframes");
        let resp = result.document.section(SectionKind::Responsibilities).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].label, "Design");
        assert_eq!(resp.items[0].children.len(), 1);
        assert_eq!(resp.items[0].children[0].label, "UX");
        assert_eq!(resp.items[0].children[0].description, "wireframes");
        assert!(resp.items[0].children[0].level > resp.items[0].level);
    }

    #[test]
    fn full_posting_is_analyzable() {
        let result = Pipeline::default().analyze(&RawDocument::new(POSTING).with_platform(Platform::LinkedIn));
        let doc = &result.document;

        assert_eq!(
            doc.kinds(),
            vec![
                SectionKind::Metadata,
                SectionKind::Overview,
                SectionKind::Responsibilities,
                SectionKind::Qualifications,
                SectionKind::Compensation,
            ]
        );
        assert_eq!(doc.section(SectionKind::Metadata).unwrap().origin, SectionOrigin::Preamble);
        assert_eq!(result.fields.title.value.as_deref(), Some("Senior Backend Engineer"));
        assert_eq!(result.fields.organization.value.as_deref(), Some("Acme Corp"));
        assert_eq!(
            result.fields.location_flexibility.value,
            Some(LocationFlexibility::RemoteAllowed)
        );
        let pay = result.fields.compensation.value.as_ref().unwrap();
        assert_eq!(pay.min, 150_000.0);
        assert_eq!(pay.max, 180_000.0);
        let experience = result.fields.experience.value.as_ref().unwrap();
        assert_eq!(experience.min_years, Some(6));
        assert_eq!(experience.level, ExperienceLevel::Senior);

        assert!(!result.quality.hallucination_detected);
        assert!(result.quality.preservation_ratio >= 0.9);
        assert!(result.quality.analyzable);
    }

    #[test]
    fn analysis_is_idempotent() {
        let pipeline = Pipeline::default();
        let first = pipeline.analyze_text(POSTING);
        let second = pipeline.analyze_text(POSTING);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn every_result_has_required_sections_once() {
        let inputs = [
            "",
            "just one line",
            POSTING,
            "RESPONSIBILITIES\n- a\nRESPONSIBILITIES\n- b",
            "## Benefits\n- dental",
        ];
        let pipeline = Pipeline::default();
        for input in inputs {
            let doc = pipeline.analyze_text(input).document;
            for kind in SectionKind::REQUIRED {
                let count = doc.sections.iter().filter(|s| s.kind == kind).count();
                assert_eq!(count, 1, "{kind:?} in {input:?}");
            }
        }
    }

    #[test]
    fn analyzable_implies_preservation_floor() {
        let pipeline = Pipeline::default();
        for input in [POSTING, "Engineer\n## Responsibilities\n- Ship code", "hello world"] {
            let q = pipeline.analyze_text(input).quality;
            assert!((0.0..=1.0).contains(&q.preservation_ratio));
            if q.analyzable {
                assert!(q.preservation_ratio >= 0.9);
            }
        }
    }

    const NO_LOCATION: &str = "## Responsibilities\n\
- Build data pipelines for the Austin office\n\
\n\
## Qualifications\n\
- 3 years of Python\n";

    #[test]
    fn oracle_fills_missing_location_when_grounded() {
        let pipeline = Pipeline::default()
            .with_oracle(Box::new(MockOracle::new("```json\n{\"location\": \"Austin\"}\n```")));
        let result = pipeline.analyze_text(NO_LOCATION);

        assert!(matches!(result.oracle, OracleOutcome::Accepted { .. }));
        assert_eq!(result.fields.location.value.as_deref(), Some("Austin"));
        let provenance = result.fields.location.provenance.as_ref().unwrap();
        assert_eq!(provenance.origin, FieldOrigin::Oracle);
        assert!(!result.quality.hallucination_detected);
    }

    #[test]
    fn oracle_invention_is_rejected() {
        let pipeline = Pipeline::default()
            .with_oracle(Box::new(MockOracle::new("{\"location\": \"Boston\"}")));
        let result = pipeline.analyze_text(NO_LOCATION);

        assert!(matches!(result.oracle, OracleOutcome::Rejected { .. }));
        assert!(!result.fields.location.is_present());
        assert_eq!(result.fields, Pipeline::default().analyze_text(NO_LOCATION).fields);
    }

    #[test]
    fn oracle_failure_falls_back_to_deterministic_result() {
        let baseline = Pipeline::default().analyze_text(NO_LOCATION);
        let result = Pipeline::default()
            .with_oracle(Box::new(FailingOracle))
            .analyze_text(NO_LOCATION);

        assert!(matches!(result.oracle, OracleOutcome::Failed { .. }));
        assert_eq!(result.document, baseline.document);
        assert_eq!(result.fields, baseline.fields);
        assert_eq!(result.quality, baseline.quality);
    }

    #[test]
    fn cache_serves_repeat_requests() {
        let pipeline = Pipeline::default().with_cache();
        let first = pipeline.analyze_text(POSTING);
        let second = pipeline.analyze_text(POSTING);
        assert_eq!(first, second);
        assert_eq!(pipeline.cache().map(|c| c.len()), Some(1));
    }

    #[test]
    fn platform_hint_from_url() {
        let raw = RawDocument::new(POSTING).with_source_url("https://www.linkedin.com/jobs/view/1");
        assert_eq!(raw.platform(), Some(Platform::LinkedIn));
        let result = Pipeline::default().analyze(&raw);
        assert!(result.document.section(SectionKind::Responsibilities).unwrap().is_detected());
    }
}
