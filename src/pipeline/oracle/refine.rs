use super::{build_prompt, parse_response, InferenceOracle, OracleOutcome, SYSTEM_PROMPT};
use crate::models::{Document, Field, FieldName, FieldOrigin, FieldSet, Provenance, SectionKind};
use crate::pipeline::text::{contains_phrase, normalize_for_dedup, word_set, words};
use crate::pipeline_config::OracleConfig;

/// Free-text fields the oracle may fill.
pub const REFINABLE_FIELDS: [FieldName; 3] =
    [FieldName::Title, FieldName::Organization, FieldName::Location];

/// Longest value accepted from the oracle (characters).
const MAX_VALUE_CHARS: usize = 120;

/// Refinable fields that are absent or below the refinement threshold.
pub fn refinement_targets(fields: &FieldSet, config: &OracleConfig) -> Vec<FieldName> {
    REFINABLE_FIELDS
        .iter()
        .copied()
        .filter(|name| !fields.is_extracted(*name) || fields.confidence(*name) < config.refine_below)
        .collect()
}

/// A proposed value is grounded when every word of it occurs in the input.
pub fn is_grounded(value: &str, input_words: &std::collections::BTreeSet<String>) -> bool {
    let mut any = false;
    for word in words(value) {
        any = true;
        if !input_words.contains(&word.to_lowercase()) {
            return false;
        }
    }
    any
}

/// Section whose body contains the value verbatim, if any.
fn source_section(doc: &Document, value: &str) -> SectionKind {
    let phrase = normalize_for_dedup(value);
    doc.sections
        .iter()
        .find(|s| {
            contains_phrase(&normalize_for_dedup(&s.body), &phrase)
                || contains_phrase(&normalize_for_dedup(&s.title), &phrase)
        })
        .map(|s| s.kind)
        .unwrap_or(SectionKind::Unknown)
}

/// Ask the oracle for weak fields and keep only grounded answers.
///
/// Returns a copy of `fields` with accepted values replaced; on any
/// failure the copy is identical to the input.
pub fn refine(
    oracle: &dyn InferenceOracle,
    input: &str,
    doc: &Document,
    fields: &FieldSet,
    config: &OracleConfig,
) -> (FieldSet, OracleOutcome) {
    let targets = refinement_targets(fields, config);
    if targets.is_empty() {
        return (fields.clone(), OracleOutcome::Skipped);
    }
    let _span = tracing::debug_span!("oracle_refine", targets = targets.len()).entered();

    let prompt = build_prompt(doc, &targets);
    let response = match oracle.complete(&prompt, SYSTEM_PROMPT) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "Oracle call failed, keeping deterministic fields");
            return (
                fields.clone(),
                OracleOutcome::Failed {
                    reason: e.to_string(),
                },
            );
        }
    };
    let proposal = match parse_response(&response) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Oracle response unusable");
            return (
                fields.clone(),
                OracleOutcome::Failed {
                    reason: e.to_string(),
                },
            );
        }
    };

    let input_words = word_set(input);
    let mut refined = fields.clone();
    let mut accepted = Vec::new();
    let mut ungrounded = 0usize;

    for name in &targets {
        let Some(value) = proposal.value(*name).map(str::trim) else {
            continue;
        };
        if value.is_empty() || value.chars().count() > MAX_VALUE_CHARS {
            continue;
        }
        if !is_grounded(value, &input_words) {
            ungrounded += 1;
            continue;
        }
        let field = Field::extracted(
            value.to_string(),
            config.accepted_confidence,
            Provenance {
                section: source_section(doc, value),
                snippet: value.to_string(),
                origin: FieldOrigin::Oracle,
            },
        );
        match name {
            FieldName::Title => refined.title = field,
            FieldName::Organization => refined.organization = field,
            FieldName::Location => refined.location = field,
            _ => continue,
        }
        accepted.push(*name);
    }

    if ungrounded > 0 {
        tracing::warn!(ungrounded, "Oracle proposed values absent from the input");
    }
    if accepted.is_empty() {
        let reason = if ungrounded > 0 {
            "proposed values not grounded in the input"
        } else {
            "no usable values proposed"
        };
        return (
            fields.clone(),
            OracleOutcome::Rejected {
                reason: reason.into(),
            },
        );
    }
    tracing::debug!(accepted = accepted.len(), "Oracle values accepted");
    (refined, OracleOutcome::Accepted { fields: accepted })
}
