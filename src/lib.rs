pub mod config;
pub mod pipeline_config;
pub mod models;
pub mod pipeline;
pub mod regression;

pub use models::{Document, FieldSet, Platform, QualityReport, RawDocument};
pub use pipeline::{AnalysisResult, Pipeline};
pub use pipeline_config::PipelineConfig;
pub use regression::{run_regression, RegressionReport};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// build-dependent default. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
