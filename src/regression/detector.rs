//! Regression detection: run a pipeline over a corpus, compare every case
//! with its baseline expectation, and look for sudden drops and gradual
//! downward trends in the aggregate metrics.

use std::thread;

use super::corpus::CorpusCase;
use super::similarity::{changed_fields, field_similarity, structure_similarity};
use super::trend::slope;
use super::types::{
    CaseDelta, CaseSnapshot, Metric, MetricSet, RegressionBaseline, RegressionFinding,
    RegressionKind, RegressionReport, RunRecord,
};
use super::RegressionError;
use crate::config::PIPELINE_VERSION;
use crate::pipeline::{AnalysisResult, Pipeline};
use crate::pipeline_config::RegressionConfig;

/// Cases per worker thread.
const CASES_PER_WORKER: usize = 8;

pub struct RegressionDetector<'a> {
    pipeline: &'a Pipeline,
    config: RegressionConfig,
    version: String,
}

impl<'a> RegressionDetector<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            config: pipeline.config().regression.clone(),
            pipeline,
            version: PIPELINE_VERSION.to_string(),
        }
    }

    /// Label runs and baselines with a version other than the built-in one.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Analyze every case, in parallel chunks, preserving corpus order.
    pub fn run_corpus(&self, corpus: &[CorpusCase]) -> Vec<AnalysisResult> {
        thread::scope(|scope| {
            let handles: Vec<_> = corpus
                .chunks(CASES_PER_WORKER)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|case| self.pipeline.analyze(&case.to_raw()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut results = Vec::with_capacity(corpus.len());
            for (handle, chunk) in handles.into_iter().zip(corpus.chunks(CASES_PER_WORKER)) {
                match handle.join() {
                    Ok(chunk_results) => results.extend(chunk_results),
                    Err(_) => {
                        tracing::error!(cases = chunk.len(), "Regression worker panicked");
                        results.extend(chunk.iter().map(|_| unanalyzed()));
                    }
                }
            }
            results
        })
    }

    /// Snapshot the current pipeline output as a new baseline.
    pub fn capture_baseline(&self, corpus: &[CorpusCase]) -> Result<RegressionBaseline, RegressionError> {
        if corpus.is_empty() {
            return Err(RegressionError::EmptyCorpus);
        }
        let _span = tracing::info_span!("capture_baseline", cases = corpus.len()).entered();
        let snapshots = corpus
            .iter()
            .zip(self.run_corpus(corpus))
            .map(|(case, result)| CaseSnapshot::of(case.id.clone(), &result))
            .collect();
        Ok(RegressionBaseline::capture(self.version.clone(), snapshots))
    }

    /// Compare the pipeline against `baseline`. `history` holds earlier runs
    /// against the same baseline, oldest first.
    pub fn check(
        &self,
        baseline: &RegressionBaseline,
        corpus: &[CorpusCase],
        history: &[RunRecord],
    ) -> Result<RegressionReport, RegressionError> {
        if corpus.is_empty() {
            return Err(RegressionError::EmptyCorpus);
        }
        let _span = tracing::info_span!(
            "check_regression",
            baseline = %baseline.pipeline_version,
            cases = corpus.len(),
            history = history.len(),
        )
        .entered();

        let results = self.run_corpus(corpus);
        let mut deltas = Vec::new();
        let mut new_cases = Vec::new();
        for (case, result) in corpus.iter().zip(&results) {
            match baseline.case(&case.id) {
                Some(expected) => deltas.push(case_delta(expected, &CaseSnapshot::of(case.id.clone(), result))),
                None => new_cases.push(case.id.clone()),
            }
        }
        let missing_cases: Vec<String> = baseline
            .cases
            .iter()
            .filter(|c| !corpus.iter().any(|case| case.id == c.id))
            .map(|c| c.id.clone())
            .collect();

        let aggregate = MetricSet::mean(deltas.iter().map(|d| &d.current));
        let overall_delta = if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(CaseDelta::overall_delta).sum::<f32>() / deltas.len() as f32
        };

        // Without matched cases there is nothing to compare.
        let mut findings = Vec::new();
        if !deltas.is_empty() {
            // Baseline side restricted to the matched cases.
            let previous = history
                .last()
                .map(|r| r.metrics)
                .unwrap_or_else(|| MetricSet::mean(deltas.iter().map(|d| &d.baseline)));
            findings = sudden_drops(&previous, &aggregate, self.config.sudden_drop_ratio);
            findings.extend(gradual_declines(history, &aggregate, &self.config));
        }

        for finding in &findings {
            tracing::warn!(
                metric = %finding.metric,
                kind = %finding.kind,
                previous = finding.previous,
                current = finding.current,
                "Regression detected"
            );
        }
        if !new_cases.is_empty() || !missing_cases.is_empty() {
            tracing::info!(
                new = new_cases.len(),
                missing = missing_cases.len(),
                "Corpus differs from baseline"
            );
        }

        Ok(RegressionReport {
            pipeline_version: self.version.clone(),
            baseline_version: baseline.pipeline_version.clone(),
            detected: !findings.is_empty(),
            per_case_deltas: deltas,
            overall_delta,
            aggregate,
            findings,
            missing_cases,
            new_cases,
        })
    }
}

fn unanalyzed() -> AnalysisResult {
    AnalysisResult {
        document: crate::models::Document::placeholders(),
        fields: crate::models::FieldSet::empty(),
        quality: crate::models::QualityReport::unrecoverable(),
        oracle: crate::pipeline::oracle::OracleOutcome::NotConfigured,
        pipeline_version: PIPELINE_VERSION.to_string(),
    }
}

fn case_delta(expected: &CaseSnapshot, current: &CaseSnapshot) -> CaseDelta {
    let mut now = MetricSet::of_report(&current.quality);
    now.field_similarity = field_similarity(&expected.fields, &current.fields);
    now.structure_similarity = structure_similarity(
        &expected.section_order,
        &current.section_order,
        &expected.present_kinds,
        &current.present_kinds,
    );
    CaseDelta {
        id: current.id.clone(),
        baseline: MetricSet::of_report(&expected.quality),
        current: now,
        changed_fields: changed_fields(&expected.fields, &current.fields),
    }
}

/// Metrics that fell by more than `ratio` relative to `previous`.
pub fn sudden_drops(previous: &MetricSet, current: &MetricSet, ratio: f32) -> Vec<RegressionFinding> {
    Metric::ALL
        .iter()
        .filter_map(|metric| {
            let before = previous.get(*metric);
            let after = current.get(*metric);
            if before <= 0.0 {
                return None;
            }
            let drop = (before - after) / before;
            (drop > ratio).then_some(RegressionFinding {
                metric: *metric,
                kind: RegressionKind::Sudden,
                previous: before,
                current: after,
                magnitude: drop,
            })
        })
        .collect()
}

/// Metrics whose least-squares slope over the trailing window (earlier runs
/// plus the current one) is steeper than the configured threshold.
pub fn gradual_declines(
    history: &[RunRecord],
    current: &MetricSet,
    config: &RegressionConfig,
) -> Vec<RegressionFinding> {
    let window = config.trailing_window.max(2);
    let earlier = &history[history.len().saturating_sub(window - 1)..];
    if earlier.len() + 1 < 3 {
        return Vec::new();
    }

    Metric::ALL
        .iter()
        .filter_map(|metric| {
            let mut series: Vec<f32> = earlier.iter().map(|r| r.metrics.get(*metric)).collect();
            series.push(current.get(*metric));
            let s = slope(&series)?;
            (s < -config.gradual_slope_threshold).then_some(RegressionFinding {
                metric: *metric,
                kind: RegressionKind::Gradual,
                previous: series[0],
                current: current.get(*metric),
                magnitude: s,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn corpus() -> Vec<CorpusCase> {
        vec![
            CorpusCase::new(
                "backend",
                "Senior Backend Engineer\nAcme Corp\n\n## Responsibilities\n- Design: own services\n\n## Qualifications\n- 6+ years of experience with Rust\n",
            ),
            CorpusCase::new(
                "inline",
                "**Responsibilities:** Build things.\n**Qualifications:** 5 years experience.",
            ),
            CorpusCase::new("remote", "## About the role\nRemote - work from anywhere.\n"),
        ]
    }

    fn metrics(overall: f32) -> MetricSet {
        MetricSet {
            overall,
            structure: 0.8,
            completeness: 0.5,
            preservation: 1.0,
            field_similarity: 1.0,
            structure_similarity: 1.0,
        }
    }

    fn record(overall: f32) -> RunRecord {
        RunRecord {
            id: Uuid::new_v4(),
            pipeline_version: "v".into(),
            baseline_version: "v".into(),
            recorded_at: Utc::now(),
            metrics: metrics(overall),
            detected: false,
        }
    }

    #[test]
    fn unchanged_pipeline_twice_detects_nothing() {
        let pipeline = Pipeline::default();
        let detector = RegressionDetector::new(&pipeline);
        let corpus = corpus();
        let baseline = detector.capture_baseline(&corpus).unwrap();

        let first = detector.check(&baseline, &corpus, &[]).unwrap();
        assert!(!first.detected, "{:?}", first.findings);
        assert_eq!(first.overall_delta, 0.0);

        let second = detector.check(&baseline, &corpus, &[first.to_run_record()]).unwrap();
        assert!(!second.detected, "{:?}", second.findings);
        assert_eq!(second.overall_delta, 0.0);
        assert!(second.per_case_deltas.iter().all(|d| d.changed_fields.is_empty()));
        assert_eq!(second.aggregate.field_similarity, 1.0);
        assert_eq!(second.aggregate.structure_similarity, 1.0);
    }

    #[test]
    fn degraded_output_against_better_baseline_is_flagged() {
        let pipeline = Pipeline::default();
        let detector = RegressionDetector::new(&pipeline);
        let corpus = corpus();
        let mut baseline = detector.capture_baseline(&corpus).unwrap();
        for case in &mut baseline.cases {
            case.quality.overall = 1.0;
            for (name, value) in &mut case.fields {
                if *name == crate::models::FieldName::Title {
                    *value = Some("Principal Architect".into());
                }
            }
        }

        let report = detector.check(&baseline, &corpus, &[]).unwrap();
        assert!(report.detected);
        assert!(report.overall_delta < 0.0);
        assert!(report
            .findings
            .iter()
            .any(|f| f.metric == Metric::Overall && f.kind == RegressionKind::Sudden));
        assert!(report.aggregate.field_similarity < 1.0);
        assert!(report
            .per_case_deltas
            .iter()
            .all(|d| d.changed_fields.contains(&crate::models::FieldName::Title)));
    }

    #[test]
    fn sudden_drop_beyond_ratio_flagged() {
        let findings = sudden_drops(&metrics(0.80), &metrics(0.64), 0.15);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].metric, Metric::Overall);
        assert_eq!(findings[0].kind, RegressionKind::Sudden);
        assert!((findings[0].magnitude - 0.2).abs() < 1e-5);

        assert!(sudden_drops(&metrics(0.80), &metrics(0.70), 0.15).is_empty());
        assert!(sudden_drops(&metrics(0.80), &metrics(0.95), 0.15).is_empty());
    }

    #[test]
    fn gradual_decline_over_window_flagged() {
        let config = RegressionConfig::default();
        let history: Vec<RunRecord> = [0.90, 0.87, 0.84, 0.81].iter().map(|v| record(*v)).collect();
        let findings = gradual_declines(&history, &metrics(0.78), &config);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, RegressionKind::Gradual);
        assert!((findings[0].magnitude + 0.03).abs() < 1e-4);

        // Each step is small enough to pass the sudden check.
        assert!(sudden_drops(&metrics(0.81), &metrics(0.78), config.sudden_drop_ratio).is_empty());
    }

    #[test]
    fn trend_needs_three_points() {
        let config = RegressionConfig::default();
        assert!(gradual_declines(&[record(0.9)], &metrics(0.5), &config).is_empty());
    }

    #[test]
    fn window_ignores_old_runs() {
        let config = RegressionConfig::default();
        // A steep early decline followed by a flat window.
        let history: Vec<RunRecord> = [0.99, 0.95, 0.80, 0.80, 0.80, 0.80]
            .iter()
            .map(|v| record(*v))
            .collect();
        assert!(gradual_declines(&history, &metrics(0.80), &config).is_empty());
    }

    #[test]
    fn corpus_drift_reported() {
        let pipeline = Pipeline::default();
        let detector = RegressionDetector::new(&pipeline);
        let corpus = corpus();
        let baseline = detector.capture_baseline(&corpus[..2]).unwrap();

        let report = detector.check(&baseline, &corpus[1..], &[]).unwrap();
        assert_eq!(report.new_cases, vec!["remote"]);
        assert_eq!(report.missing_cases, vec!["backend"]);
        assert_eq!(report.per_case_deltas.len(), 1);
    }

    #[test]
    fn disjoint_corpus_is_not_a_regression() {
        let pipeline = Pipeline::default();
        let detector = RegressionDetector::new(&pipeline);
        let corpus = corpus();
        let baseline = detector.capture_baseline(&corpus[..1]).unwrap();
        let renamed = vec![CorpusCase::new("backend-copy", corpus[0].text.clone())];

        let report = detector.check(&baseline, &renamed, &[]).unwrap();
        assert!(!report.detected, "{:?}", report.findings);
        assert!(report.per_case_deltas.is_empty());
        assert_eq!(report.new_cases, vec!["backend-copy"]);
    }

    #[test]
    fn dropping_a_strong_case_is_not_a_regression() {
        let pipeline = Pipeline::default();
        let detector = RegressionDetector::new(&pipeline);
        let corpus = corpus();
        let mut baseline = detector.capture_baseline(&corpus).unwrap();
        // The case left out of the run scored far above the rest.
        for case in &mut baseline.cases {
            if case.id == "backend" {
                case.quality.overall = 1.0;
                case.quality.structure_score = 1.0;
                case.quality.field_completeness_score = 1.0;
            }
        }

        let report = detector.check(&baseline, &corpus[1..], &[]).unwrap();
        assert!(!report.detected, "{:?}", report.findings);
        assert_eq!(report.missing_cases, vec!["backend"]);
        assert_eq!(report.overall_delta, 0.0);
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let pipeline = Pipeline::default();
        assert!(matches!(
            RegressionDetector::new(&pipeline).capture_baseline(&[]),
            Err(RegressionError::EmptyCorpus)
        ));
    }
}
