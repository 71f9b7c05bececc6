//! Similarity between a case's current output and its baseline expectation.

use std::collections::BTreeSet;

use crate::models::{FieldName, SectionKind};
use crate::pipeline::text::word_overlap;

/// Mean per-field similarity: both absent 1, one absent 0, otherwise
/// normalized word overlap. Fields missing from one side count as absent.
pub fn field_similarity(
    baseline: &[(FieldName, Option<String>)],
    current: &[(FieldName, Option<String>)],
) -> f32 {
    let value = |set: &[(FieldName, Option<String>)], name: FieldName| {
        set.iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, v)| v.clone())
    };
    let total: f32 = FieldName::ALL
        .iter()
        .map(|name| match (value(baseline, *name), value(current, *name)) {
            (None, None) => 1.0,
            (Some(a), Some(b)) => word_overlap(&a, &b),
            _ => 0.0,
        })
        .sum();
    total / FieldName::ALL.len() as f32
}

/// Fields whose rendered value differs.
pub fn changed_fields(
    baseline: &[(FieldName, Option<String>)],
    current: &[(FieldName, Option<String>)],
) -> Vec<FieldName> {
    FieldName::ALL
        .iter()
        .copied()
        .filter(|name| {
            let a = baseline.iter().find(|(n, _)| n == name).map(|(_, v)| v);
            let b = current.iter().find(|(n, _)| n == name).map(|(_, v)| v);
            a != b
        })
        .collect()
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[SectionKind], b: &[SectionKind]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    for x in a {
        let mut row = vec![0usize; b.len() + 1];
        for (j, y) in b.iter().enumerate() {
            row[j + 1] = if x == y {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        prev = row;
    }
    prev[b.len()]
}

/// Mean of section presence (Jaccard) and section order (LCS over the
/// longer sequence) agreement.
pub fn structure_similarity(
    baseline_order: &[SectionKind],
    current_order: &[SectionKind],
    baseline_present: &[SectionKind],
    current_present: &[SectionKind],
) -> f32 {
    let a: BTreeSet<SectionKind> = baseline_present.iter().copied().collect();
    let b: BTreeSet<SectionKind> = current_present.iter().copied().collect();
    let presence = if a.is_empty() && b.is_empty() {
        1.0
    } else {
        a.intersection(&b).count() as f32 / a.union(&b).count() as f32
    };

    let longest = baseline_order.len().max(current_order.len());
    let order = if longest == 0 {
        1.0
    } else {
        lcs_len(baseline_order, current_order) as f32 / longest as f32
    };

    (presence + order) / 2.0
}
