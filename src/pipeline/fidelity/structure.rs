//! Structure and completeness scores.

use crate::models::{Document, FieldName, FieldSet, SectionKind, SectionOrigin};

const ORDER_WEIGHT: f32 = 0.3;
const PRESENCE_WEIGHT: f32 = 0.4;
const BULLET_WEIGHT: f32 = 0.3;

/// Share of adjacent detected sections that follow canonical order.
/// One detected section is trivially ordered; none scores 0.
pub fn order_ratio(doc: &Document) -> f32 {
    let order: Vec<SectionKind> = doc
        .detected_order()
        .into_iter()
        .filter(|k| *k != SectionKind::Unknown)
        .collect();
    match order.len() {
        0 => 0.0,
        1 => 1.0,
        n => {
            let ordered = order
                .windows(2)
                .filter(|pair| pair[0].canonical_rank() <= pair[1].canonical_rank())
                .count();
            ordered as f32 / (n - 1) as f32
        }
    }
}

/// Mean presence of required kinds: detected 1, synthesized from other
/// content 0.5, placeholder 0.
pub fn presence_ratio(doc: &Document) -> f32 {
    let total: f32 = SectionKind::REQUIRED
        .iter()
        .map(|kind| match doc.section(*kind).map(|s| s.origin) {
            Some(SectionOrigin::Detected) => 1.0,
            Some(SectionOrigin::Preamble) | Some(SectionOrigin::Fallback { .. }) => 0.5,
            Some(SectionOrigin::Placeholder) | None => 0.0,
        })
        .sum();
    total / SectionKind::REQUIRED.len() as f32
}

fn non_trivial(description: &str) -> bool {
    description.chars().filter(|c| c.is_alphanumeric()).count() >= 2
}

/// Mean item quality (label and description weighted 0.5 each), or
/// `None` when the document has no items.
pub fn bullet_quality(doc: &Document) -> Option<f32> {
    let items = doc.all_items();
    if items.is_empty() {
        return None;
    }
    let total: f32 = items
        .iter()
        .map(|item| {
            let label = if item.label.trim().is_empty() { 0.0 } else { 0.5 };
            let description = if non_trivial(&item.description) { 0.5 } else { 0.0 };
            label + description
        })
        .sum();
    Some(total / items.len() as f32)
}

/// Weighted structure score; the bullet term is dropped and the rest
/// renormalized when there are no items.
pub fn structure_score(doc: &Document) -> f32 {
    let base = ORDER_WEIGHT * order_ratio(doc) + PRESENCE_WEIGHT * presence_ratio(doc);
    match bullet_quality(doc) {
        Some(bullets) => base + BULLET_WEIGHT * bullets,
        None => base / (ORDER_WEIGHT + PRESENCE_WEIGHT),
    }
}

/// Extracted-field share with required fields weighted double.
pub fn field_completeness(fields: &FieldSet) -> f32 {
    let (mut got, mut total) = (0.0f32, 0.0f32);
    for name in FieldName::ALL {
        let weight = if name.is_required() { 2.0 } else { 1.0 };
        total += weight;
        if fields.is_extracted(name) {
            got += weight;
        }
    }
    got / total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, Provenance};
    use crate::pipeline::fields::tests::doc;

    #[test]
    fn placeholders_score_zero() {
        let d = Document::placeholders();
        assert_eq!(order_ratio(&d), 0.0);
        assert_eq!(presence_ratio(&d), 0.0);
        assert_eq!(bullet_quality(&d), None);
        assert_eq!(structure_score(&d), 0.0);
    }

    #[test]
    fn out_of_order_sections_lower_ratio() {
        let mut d = doc(&[
            (SectionKind::Qualifications, "q", &[]),
            (SectionKind::Overview, "o", &[]),
            (SectionKind::Compensation, "c", &[]),
        ]);
        for (i, s) in d.sections.iter_mut().enumerate() {
            s.span = Some(crate::models::Span::new(i * 10, i * 10 + 1));
        }
        assert!((order_ratio(&d) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn bullet_quality_rewards_descriptions() {
        let d = doc(&[(SectionKind::Qualifications, "", &[("Rust", "3 years"), ("Go", "")])]);
        assert!((bullet_quality(&d).unwrap() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn required_fields_weigh_double() {
        let p = Provenance::pattern(SectionKind::Metadata, "x");
        let fields = FieldSet {
            title: Field::extracted("Engineer".into(), 0.7, p.clone()),
            location: Field::extracted("Austin, TX".into(), 0.9, p),
            ..FieldSet::empty()
        };
        assert!((field_completeness(&fields) - 0.3).abs() < 1e-6);
        assert_eq!(field_completeness(&FieldSet::empty()), 0.0);
    }
}
