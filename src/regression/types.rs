use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::{str_enum, ParseEnumError};
use crate::models::{FieldName, QualityReport, SectionKind};
use crate::pipeline::AnalysisResult;

str_enum!(
    /// Aggregate quality metric tracked across regression runs.
    Metric {
        Overall => "overall",
        Structure => "structure",
        Completeness => "completeness",
        Preservation => "preservation",
        FieldSimilarity => "field_similarity",
        StructureSimilarity => "structure_similarity",
    }
);

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Overall,
        Metric::Structure,
        Metric::Completeness,
        Metric::Preservation,
        Metric::FieldSimilarity,
        Metric::StructureSimilarity,
    ];
}

str_enum!(
    /// Sudden: drop versus the immediately preceding run.
    /// Gradual: downward trend over the trailing window.
    RegressionKind {
        Sudden => "sudden",
        Gradual => "gradual",
    }
);

/// One value per [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MetricSet {
    pub overall: f32,
    pub structure: f32,
    pub completeness: f32,
    pub preservation: f32,
    pub field_similarity: f32,
    pub structure_similarity: f32,
}

impl MetricSet {
    pub fn get(&self, metric: Metric) -> f32 {
        match metric {
            Metric::Overall => self.overall,
            Metric::Structure => self.structure,
            Metric::Completeness => self.completeness,
            Metric::Preservation => self.preservation,
            Metric::FieldSimilarity => self.field_similarity,
            Metric::StructureSimilarity => self.structure_similarity,
        }
    }

    /// Quality metrics of a report, with similarities set to identity.
    pub fn of_report(quality: &QualityReport) -> Self {
        Self {
            overall: quality.overall,
            structure: quality.structure_score,
            completeness: quality.field_completeness_score,
            preservation: quality.preservation_ratio,
            field_similarity: 1.0,
            structure_similarity: 1.0,
        }
    }

    /// Per-metric mean. Empty input yields all zeros.
    pub fn mean<'a>(sets: impl IntoIterator<Item = &'a MetricSet>) -> MetricSet {
        let mut sum = MetricSet::default();
        let mut n = 0usize;
        for s in sets {
            sum.overall += s.overall;
            sum.structure += s.structure;
            sum.completeness += s.completeness;
            sum.preservation += s.preservation;
            sum.field_similarity += s.field_similarity;
            sum.structure_similarity += s.structure_similarity;
            n += 1;
        }
        if n == 0 {
            return sum;
        }
        let n = n as f32;
        MetricSet {
            overall: sum.overall / n,
            structure: sum.structure / n,
            completeness: sum.completeness / n,
            preservation: sum.preservation / n,
            field_similarity: sum.field_similarity / n,
            structure_similarity: sum.structure_similarity / n,
        }
    }
}

/// Stored expectation for one corpus case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub id: String,
    pub quality: QualityReport,
    pub fields: Vec<(FieldName, Option<String>)>,
    /// Detected sections in input order.
    pub section_order: Vec<SectionKind>,
    /// Every finalized section kind that carries content.
    pub present_kinds: Vec<SectionKind>,
}

impl CaseSnapshot {
    pub fn of(id: impl Into<String>, result: &AnalysisResult) -> Self {
        Self {
            id: id.into(),
            quality: result.quality.clone(),
            fields: result.fields.snapshot(),
            section_order: result.document.detected_order(),
            present_kinds: result
                .document
                .sections
                .iter()
                .filter(|s| s.has_content())
                .map(|s| s.kind)
                .collect(),
        }
    }
}

/// Accepted pipeline output over a corpus. Immutable once stored; a new
/// version supersedes it rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionBaseline {
    pub id: Uuid,
    pub pipeline_version: String,
    pub created_at: DateTime<Utc>,
    /// Sorted by case id.
    pub cases: Vec<CaseSnapshot>,
}

impl RegressionBaseline {
    pub fn capture(pipeline_version: impl Into<String>, mut cases: Vec<CaseSnapshot>) -> Self {
        cases.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            id: Uuid::new_v4(),
            pipeline_version: pipeline_version.into(),
            created_at: Utc::now(),
            cases,
        }
    }

    pub fn case(&self, id: &str) -> Option<&CaseSnapshot> {
        self.cases
            .binary_search_by(|c| c.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.cases[i])
    }

    /// Aggregate metrics of the baseline itself.
    pub fn aggregate(&self) -> MetricSet {
        let sets: Vec<MetricSet> = self
            .cases
            .iter()
            .map(|c| MetricSet::of_report(&c.quality))
            .collect();
        MetricSet::mean(&sets)
    }
}

/// Comparison of one case against its baseline expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDelta {
    pub id: String,
    pub baseline: MetricSet,
    pub current: MetricSet,
    /// Fields whose rendered value differs from the baseline.
    pub changed_fields: Vec<FieldName>,
}

impl CaseDelta {
    /// Change of the overall score (negative is worse).
    pub fn overall_delta(&self) -> f32 {
        self.current.overall - self.baseline.overall
    }
}

/// One detected regression signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionFinding {
    pub metric: Metric,
    pub kind: RegressionKind,
    pub previous: f32,
    pub current: f32,
    /// Relative drop for sudden findings, per-run slope for gradual ones.
    pub magnitude: f32,
}

/// Aggregate metrics of one recorded regression run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub pipeline_version: String,
    pub baseline_version: String,
    pub recorded_at: DateTime<Utc>,
    pub metrics: MetricSet,
    pub detected: bool,
}

/// Outcome of checking a pipeline version against a baseline. A detected
/// regression is data, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub pipeline_version: String,
    pub baseline_version: String,
    pub detected: bool,
    pub per_case_deltas: Vec<CaseDelta>,
    /// Mean change of the overall score across compared cases.
    pub overall_delta: f32,
    pub aggregate: MetricSet,
    pub findings: Vec<RegressionFinding>,
    /// Baseline cases absent from the corpus.
    pub missing_cases: Vec<String>,
    /// Corpus cases absent from the baseline.
    pub new_cases: Vec<String>,
}

impl RegressionReport {
    pub fn to_run_record(&self) -> RunRecord {
        RunRecord {
            id: Uuid::new_v4(),
            pipeline_version: self.pipeline_version.clone(),
            baseline_version: self.baseline_version.clone(),
            recorded_at: Utc::now(),
            metrics: self.aggregate,
            detected: self.detected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, overall: f32) -> CaseSnapshot {
        CaseSnapshot {
            id: id.into(),
            quality: QualityReport {
                overall,
                ..QualityReport::unrecoverable()
            },
            fields: Vec::new(),
            section_order: Vec::new(),
            present_kinds: Vec::new(),
        }
    }

    #[test]
    fn capture_sorts_cases() {
        let baseline = RegressionBaseline::capture("v1", vec![snapshot("b", 0.5), snapshot("a", 0.7)]);
        assert_eq!(baseline.cases[0].id, "a");
        assert!(baseline.case("b").is_some());
        assert!(baseline.case("c").is_none());
    }

    #[test]
    fn aggregate_is_mean_with_identity_similarity() {
        let baseline = RegressionBaseline::capture("v1", vec![snapshot("a", 0.4), snapshot("b", 0.8)]);
        let agg = baseline.aggregate();
        assert!((agg.overall - 0.6).abs() < 1e-6);
        assert_eq!(agg.field_similarity, 1.0);
        assert_eq!(agg.structure_similarity, 1.0);
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(MetricSet::mean(&[]), MetricSet::default());
    }

    #[test]
    fn metric_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>().unwrap(), metric);
        }
    }
}
