//! Optional refinement of weak fields by an external text-completion
//! oracle. Oracle output is untrusted: every proposed value must be
//! grounded in the input, and any failure leaves the deterministic result
//! unchanged.

pub mod ollama;
pub mod prompt;
pub mod refine;

pub use ollama::*;
pub use prompt::*;
pub use refine::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FieldName;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle is not reachable at {0}")]
    Connection(String),

    #[error("Oracle returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Oracle request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed oracle response: {0}")]
    MalformedResponse(String),
}

/// Opaque text-completion service.
pub trait InferenceOracle: Send + Sync {
    fn complete(&self, prompt: &str, system: &str) -> Result<String, OracleError>;
}

/// What the refinement step did to a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum OracleOutcome {
    /// No oracle attached to the pipeline.
    NotConfigured,
    /// Every refinable field was already confident.
    Skipped,
    Accepted { fields: Vec<FieldName> },
    Rejected { reason: String },
    Failed { reason: String },
}

/// Mock oracle for testing: returns a fixed response and counts calls.
pub struct MockOracle {
    response: String,
    calls: AtomicUsize,
}

impl MockOracle {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InferenceOracle for MockOracle {
    fn complete(&self, _prompt: &str, _system: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Oracle that always times out.
pub struct FailingOracle;

impl InferenceOracle for FailingOracle {
    fn complete(&self, _prompt: &str, _system: &str) -> Result<String, OracleError> {
        Err(OracleError::Timeout(30))
    }
}
