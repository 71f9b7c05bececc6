pub mod text;
pub mod sanitize; // Input normalization (HTML, entities, invisible chars)
pub mod boundary;
pub mod classify;
pub mod list_items;
pub mod assemble;
pub mod fields;
pub mod fidelity;
pub mod oracle; // Optional refinement of weak fields
pub mod cache;
pub mod processor; // Pipeline orchestrator

pub use processor::{AnalysisResult, Pipeline};
