//! Fidelity validation: how much of the input survived into the output,
//! whether the output says anything the input did not, and how complete
//! the structure and fields are.

pub mod structure;
pub mod tokens;

pub use structure::*;
pub use tokens::*;

use std::collections::BTreeSet;

use super::assemble::strip_noise;
use super::text::word_set;
use crate::models::{flatten_items, Document, FieldSet, QualityReport};
use crate::pipeline_config::PipelineConfig;

const STRUCTURE_WEIGHT: f32 = 0.30;
const COMPLETENESS_WEIGHT: f32 = 0.35;
const PRESERVATION_WEIGHT: f32 = 0.25;
const HALLUCINATION_WEIGHT: f32 = 0.10;
/// Each hallucinated token costs this share of the output's important tokens.
const HALLUCINATION_PENALTY_SCALE: f32 = 10.0;

/// Everything the pipeline emits as text: section titles it did not
/// invent, bodies, items, and extracted field text.
pub fn output_text(doc: &Document, fields: &FieldSet) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for section in &doc.sections {
        if !section.synthesized {
            parts.push(&section.title);
        }
        parts.push(&section.body);
        for item in flatten_items(&section.items) {
            parts.push(&item.label);
            parts.push(&item.description);
        }
    }
    parts.extend(fields.text_values());
    parts.join("\n")
}

/// Validate the output of one run against its sanitized input.
pub fn validate(raw: &str, doc: &Document, fields: &FieldSet, config: &PipelineConfig) -> QualityReport {
    let _span = tracing::debug_span!("validate_fidelity", bytes = raw.len()).entered();

    let output = output_text(doc, fields);
    let output_words = word_set(&output);
    let output_important = important_tokens(&output);

    // Boilerplate is removed on purpose; it does not count as loss.
    let raw_important = important_tokens(&strip_noise(raw));
    let raw_words = word_set(raw);

    let preservation_ratio = if raw_important.is_empty() {
        1.0
    } else {
        let kept = raw_important.intersection(&output_words).count();
        kept as f32 / raw_important.len() as f32
    };

    let headers = canonical_header_tokens();
    let hallucinated: BTreeSet<&String> = output_important
        .iter()
        .filter(|t| !raw_words.contains(*t) && !headers.contains(*t))
        .collect();
    let hallucination_detected = !hallucinated.is_empty();
    let penalty = if output_important.is_empty() {
        0.0
    } else {
        (HALLUCINATION_PENALTY_SCALE * hallucinated.len() as f32 / output_important.len() as f32)
            .min(1.0)
    };

    let structure_score = structure_score(doc);
    let field_completeness_score = field_completeness(fields);
    let overall = (STRUCTURE_WEIGHT * structure_score
        + COMPLETENESS_WEIGHT * field_completeness_score
        + PRESERVATION_WEIGHT * preservation_ratio
        + HALLUCINATION_WEIGHT * (1.0 - penalty))
        .clamp(0.0, 1.0);

    let analyzable =
        overall >= config.analyzable_threshold && preservation_ratio >= config.preservation_floor;

    if hallucination_detected {
        tracing::warn!(tokens = hallucinated.len(), "Output contains tokens absent from the input");
    }
    if !analyzable {
        tracing::info!(overall, preservation_ratio, "Result marked not analyzable");
    }

    QualityReport {
        preservation_ratio,
        hallucination_detected,
        structure_score,
        field_completeness_score,
        overall,
        analyzable,
        hallucinated_tokens: hallucinated.into_iter().cloned().collect(),
        conflicts: fields.conflicts.clone(),
    }
}
