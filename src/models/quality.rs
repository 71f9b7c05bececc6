use serde::{Deserialize, Serialize};

use super::fields::ConsistencyConflict;

/// Fidelity and completeness of one pipeline run. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub preservation_ratio: f32,
    pub hallucination_detected: bool,
    pub structure_score: f32,
    pub field_completeness_score: f32,
    pub overall: f32,
    /// False when `overall` or `preservation_ratio` fall below their floors.
    /// The data is kept; callers decide whether to proceed.
    pub analyzable: bool,
    /// Output tokens absent from the input, sorted.
    pub hallucinated_tokens: Vec<String>,
    pub conflicts: Vec<ConsistencyConflict>,
}

impl QualityReport {
    /// Report for input that cannot be analyzed at all.
    pub fn unrecoverable() -> Self {
        Self {
            preservation_ratio: 0.0,
            hallucination_detected: false,
            structure_score: 0.0,
            field_completeness_score: 0.0,
            overall: 0.0,
            analyzable: false,
            hallucinated_tokens: Vec::new(),
            conflicts: Vec::new(),
        }
    }
}
