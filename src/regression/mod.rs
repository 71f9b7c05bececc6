//! Offline regression detection against stored baselines.

pub mod corpus;
pub mod detector;
pub mod similarity;
pub mod store;
pub mod trend;
pub mod types;

pub use corpus::*;
pub use detector::*;
pub use store::*;
pub use types::*;

use thiserror::Error;

use crate::pipeline::Pipeline;

#[derive(Error, Debug)]
pub enum RegressionError {
    #[error("No baseline stored for version {version}")]
    NoBaseline { version: String },

    #[error("Corpus contains no cases")]
    EmptyCorpus,

    #[error("Baseline store error: {0}")]
    Store(#[from] StoreError),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capture the pipeline's current output over `corpus` and store it under
/// `version` (the built-in pipeline version when `None`).
pub fn capture_and_store(
    pipeline: &Pipeline,
    store: &dyn BaselineStore,
    corpus: &[CorpusCase],
    version: Option<&str>,
) -> Result<RegressionBaseline, RegressionError> {
    let mut detector = RegressionDetector::new(pipeline);
    if let Some(v) = version {
        detector = detector.with_version(v);
    }
    let baseline = detector.capture_baseline(corpus)?;
    store.save_baseline(&baseline)?;
    Ok(baseline)
}

/// Check the pipeline against a stored baseline (the latest when
/// `baseline_version` is `None`), then record the run.
pub fn run_regression(
    pipeline: &Pipeline,
    store: &dyn BaselineStore,
    corpus: &[CorpusCase],
    baseline_version: Option<&str>,
) -> Result<RegressionReport, RegressionError> {
    let baseline = match baseline_version {
        Some(v) => store.load_baseline(v)?,
        None => store.latest_baseline()?,
    }
    .ok_or_else(|| RegressionError::NoBaseline {
        version: baseline_version.unwrap_or("latest").to_string(),
    })?;

    let history = store.runs_for(&baseline.pipeline_version)?;
    let report = RegressionDetector::new(pipeline).check(&baseline, corpus, &history)?;
    store.record_run(&report.to_run_record())?;
    tracing::info!(
        baseline = %report.baseline_version,
        detected = report.detected,
        overall_delta = report.overall_delta,
        "Regression run recorded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<CorpusCase> {
        vec![
            CorpusCase::new("a", "## Responsibilities\n- Design:\n  - UX: wireframes"),
            CorpusCase::new("b", "Data Analyst\nInitech\n\n## Qualifications\n- 2 years of SQL"),
        ]
    }

    #[test]
    fn capture_then_run_records_history() {
        let store = InMemoryBaselineStore::new();
        let pipeline = Pipeline::default();
        capture_and_store(&pipeline, &store, &corpus(), Some("v1")).unwrap();

        let first = run_regression(&pipeline, &store, &corpus(), Some("v1")).unwrap();
        let second = run_regression(&pipeline, &store, &corpus(), None).unwrap();
        assert!(!first.detected);
        assert!(!second.detected);
        assert_eq!(second.overall_delta, 0.0);
        assert_eq!(store.runs_for("v1").unwrap().len(), 2);
    }

    #[test]
    fn missing_baseline_is_an_error() {
        let store = InMemoryBaselineStore::new();
        let err = run_regression(&Pipeline::default(), &store, &corpus(), None).unwrap_err();
        assert!(matches!(err, RegressionError::NoBaseline { .. }));
    }

    #[test]
    fn baseline_versions_are_immutable() {
        let store = SqliteBaselineStore::open_in_memory().unwrap();
        let pipeline = Pipeline::default();
        capture_and_store(&pipeline, &store, &corpus(), Some("v1")).unwrap();
        let err = capture_and_store(&pipeline, &store, &corpus(), Some("v1")).unwrap_err();
        assert!(matches!(
            err,
            RegressionError::Store(StoreError::BaselineExists { .. })
        ));
    }
}
