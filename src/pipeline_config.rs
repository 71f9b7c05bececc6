//! Pipeline configuration: every tunable threshold and weight.
//!
//! Loaded once (defaults, a JSON file, or the file named by `JOBSIFT_CONFIG`)
//! and then shared immutably by every stage. Keyword tables and pattern
//! families are static data living next to the stage that uses them; this
//! struct only carries the numbers that tune them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CONFIG_PATH_ENV;
use crate::models::Platform;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Base confidence assigned by each boundary pattern family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorConfidences {
    pub explicit_header: f32,
    pub bold_emphasis: f32,
    /// Bold text at line start followed by more text on the same line.
    pub bold_inline: f32,
    pub colon_terminated: f32,
    pub all_caps: f32,
}

impl Default for DetectorConfidences {
    fn default() -> Self {
        Self {
            explicit_header: 0.90,
            bold_emphasis: 0.80,
            bold_inline: 0.55,
            colon_terminated: 0.60,
            all_caps: 0.45,
        }
    }
}

/// Weights of the composite section score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierWeights {
    pub keyword: f32,
    pub structure: f32,
    pub position: f32,
}

impl ClassifierWeights {
    /// Content signals dominate: the platform renders reliable headers.
    pub const HIGH_STRUCTURE: Self = Self {
        keyword: 0.50,
        structure: 0.25,
        position: 0.25,
    };

    /// Position prior dominates: headers on unknown sources are unreliable.
    pub const LOW_STRUCTURE: Self = Self {
        keyword: 0.35,
        structure: 0.15,
        position: 0.50,
    };

    fn total(&self) -> f32 {
        self.keyword + self.structure + self.position
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleConfig {
    /// Fields below this confidence (or absent) are offered to the oracle.
    pub refine_below: f32,
    /// Confidence assigned to an oracle value that passed grounding.
    pub accepted_confidence: f32,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            refine_below: 0.50,
            accepted_confidence: 0.50,
            base_url: "http://localhost:11434".into(),
            model: "llama3.1:8b".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    /// Relative drop of any metric versus the preceding run that counts as sudden.
    pub sudden_drop_ratio: f32,
    /// Negative per-run slope beyond which a trend counts as gradual regression.
    pub gradual_slope_threshold: f32,
    /// Number of runs (including the current one) used for trend fitting.
    pub trailing_window: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            sudden_drop_ratio: 0.15,
            gradual_slope_threshold: 0.02,
            trailing_window: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl_secs: 3600,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Minimum classifier confidence for a section candidate to be accepted.
    pub acceptance_threshold: f32,
    /// Minimum overall quality for a result to be marked analyzable.
    pub analyzable_threshold: f32,
    /// Minimum preservation ratio for a result to be marked analyzable.
    pub preservation_floor: f32,
    pub detector: DetectorConfidences,
    pub weights_high_structure: ClassifierWeights,
    pub weights_low_structure: ClassifierWeights,
    pub oracle: OracleConfig,
    pub regression: RegressionConfig,
    pub cache: CacheConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.60,
            analyzable_threshold: 0.50,
            preservation_floor: 0.90,
            detector: DetectorConfidences::default(),
            weights_high_structure: ClassifierWeights::HIGH_STRUCTURE,
            weights_low_structure: ClassifierWeights::LOW_STRUCTURE,
            oracle: OracleConfig::default(),
            regression: RegressionConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl PipelineConfig {
    /// Read a JSON configuration file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Load from `$JOBSIFT_CONFIG` when set, else defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Classifier weights for a platform: known platforms render reliable structure.
    pub fn weights_for(&self, platform: Option<Platform>) -> &ClassifierWeights {
        match platform {
            Some(p) if p.is_high_structure() => &self.weights_high_structure,
            _ => &self.weights_low_structure,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("acceptance_threshold", self.acceptance_threshold),
            ("analyzable_threshold", self.analyzable_threshold),
            ("preservation_floor", self.preservation_floor),
            ("detector.explicit_header", self.detector.explicit_header),
            ("detector.bold_emphasis", self.detector.bold_emphasis),
            ("detector.bold_inline", self.detector.bold_inline),
            ("detector.colon_terminated", self.detector.colon_terminated),
            ("detector.all_caps", self.detector.all_caps),
            ("oracle.refine_below", self.oracle.refine_below),
            ("oracle.accepted_confidence", self.oracle.accepted_confidence),
            ("regression.sudden_drop_ratio", self.regression.sudden_drop_ratio),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        for (name, w) in [
            ("weights_high_structure", &self.weights_high_structure),
            ("weights_low_structure", &self.weights_low_structure),
        ] {
            if w.keyword < 0.0 || w.structure < 0.0 || w.position < 0.0 || w.total() <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be non-negative with a positive sum"
                )));
            }
        }

        if self.regression.gradual_slope_threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "regression.gradual_slope_threshold must be non-negative".into(),
            ));
        }
        if self.regression.trailing_window < 3 {
            return Err(ConfigError::Invalid(
                "regression.trailing_window must be at least 3".into(),
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
