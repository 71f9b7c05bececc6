//! Cross-field checks. A contradiction lowers the confidence of every
//! field involved and is recorded on the field set; no field is dropped.

use super::experience::level_keyword;
use super::location::mentions_remote;
use crate::models::{
    Document, ExperienceBasis, ExperienceLevel, FieldName, FieldSet, LocationFlexibility,
    PayPeriod, SectionKind,
};
use crate::pipeline::text::{contains_phrase, normalize_for_dedup};

const TITLE_CONTAINS_ORGANIZATION: f32 = 0.75;
const FIXED_BUT_REMOTE: f32 = 0.7;
const IMPLAUSIBLE_PAY: f32 = 0.6;
const SENIORITY_MISMATCH: f32 = 0.75;

/// Hourly rates above this, or yearly salaries below it, are implausible.
const PAY_PLAUSIBILITY_PIVOT: f64 = 1000.0;

pub fn check_consistency(doc: &Document, fields: &mut FieldSet) {
    if let (Some(title), Some(org)) = (&fields.title.value, &fields.organization.value) {
        let org = normalize_for_dedup(org);
        if contains_phrase(&normalize_for_dedup(title), &org) {
            fields.record_conflict(
                vec![FieldName::Title, FieldName::Organization],
                "title contains the organization name",
                TITLE_CONTAINS_ORGANIZATION,
            );
        }
    }

    if fields.location_flexibility.value == Some(LocationFlexibility::Fixed)
        && mentions_remote(doc.body(SectionKind::Overview))
    {
        fields.record_conflict(
            vec![FieldName::Location, FieldName::LocationFlexibility],
            "fixed location contradicted by remote wording in the overview",
            FIXED_BUT_REMOTE,
        );
    }

    if let Some(comp) = &fields.compensation.value {
        let implausible = match comp.period {
            PayPeriod::Hourly => comp.max > PAY_PLAUSIBILITY_PIVOT,
            PayPeriod::Yearly => comp.max < PAY_PLAUSIBILITY_PIVOT,
            _ => false,
        };
        if implausible {
            let reason = format!("{} pay of {} is implausible", comp.period, comp.max);
            fields.record_conflict(vec![FieldName::Compensation], reason, IMPLAUSIBLE_PAY);
        }
    }

    let title_level = fields.title.value.as_deref().and_then(level_keyword);
    if let (Some(title_level), Some(exp)) = (title_level, &fields.experience.value) {
        if exp.basis == ExperienceBasis::NumericRange {
            let min = exp.min_years.unwrap_or(0);
            let mismatch = match title_level {
                ExperienceLevel::Entry => min >= 5,
                ExperienceLevel::Senior | ExperienceLevel::Executive => min < 2,
                _ => false,
            };
            if mismatch {
                let reason = format!("{title_level} title but {min} years required");
                fields.record_conflict(
                    vec![FieldName::Experience, FieldName::Title],
                    reason,
                    SENIORITY_MISMATCH,
                );
            }
        }
    }

    if !fields.conflicts.is_empty() {
        tracing::debug!(conflicts = fields.conflicts.len(), "Field consistency conflicts recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Compensation, Currency, Experience, Field, Provenance};
    use crate::pipeline::fields::tests::doc;

    fn prov() -> Provenance {
        Provenance::pattern(SectionKind::Metadata, "x")
    }

    #[test]
    fn title_containing_organization_lowers_both() {
        let mut fields = FieldSet {
            title: Field::extracted("Acme Corp Software Engineer".into(), 0.8, prov()),
            organization: Field::extracted("Acme Corp".into(), 0.8, prov()),
            ..FieldSet::empty()
        };
        check_consistency(&Document::default(), &mut fields);
        assert_eq!(fields.conflicts.len(), 1);
        assert!((fields.title.confidence - 0.6).abs() < 1e-6);
        assert!((fields.organization.confidence - 0.6).abs() < 1e-6);
        assert!(fields.title.is_present());
    }

    #[test]
    fn fixed_location_with_remote_overview() {
        let d = doc(&[(SectionKind::Overview, "This role is remote friendly.", &[])]);
        let mut fields = FieldSet {
            location: Field::extracted("Austin, TX".into(), 0.9, prov()),
            location_flexibility: Field::extracted(LocationFlexibility::Fixed, 0.6, prov()),
            ..FieldSet::empty()
        };
        check_consistency(&d, &mut fields);
        assert_eq!(
            fields.conflicts[0].fields,
            vec![FieldName::Location, FieldName::LocationFlexibility]
        );
        assert!((fields.location.confidence - 0.63).abs() < 1e-6);
        assert!((fields.location_flexibility.confidence - 0.42).abs() < 1e-6);
    }

    #[test]
    fn implausible_hourly_rate() {
        let mut fields = FieldSet {
            compensation: Field::extracted(
                Compensation {
                    min: 90_000.0,
                    max: 120_000.0,
                    currency: Currency::Usd,
                    period: PayPeriod::Hourly,
                    period_inferred: false,
                },
                0.9,
                prov(),
            ),
            ..FieldSet::empty()
        };
        check_consistency(&Document::default(), &mut fields);
        assert!((fields.compensation.confidence - 0.54).abs() < 1e-6);
    }

    #[test]
    fn senior_title_with_entry_years() {
        let mut fields = FieldSet {
            title: Field::extracted("Senior Engineer".into(), 0.7, prov()),
            experience: Field::extracted(
                Experience {
                    min_years: Some(1),
                    max_years: None,
                    level: ExperienceLevel::Entry,
                    basis: ExperienceBasis::NumericRange,
                },
                0.9,
                prov(),
            ),
            ..FieldSet::empty()
        };
        check_consistency(&Document::default(), &mut fields);
        assert_eq!(fields.conflicts.len(), 1);
        assert!((fields.experience.confidence - 0.675).abs() < 1e-6);
    }

    #[test]
    fn consistent_fields_untouched() {
        let mut fields = FieldSet {
            title: Field::extracted("Senior Engineer".into(), 0.7, prov()),
            organization: Field::extracted("Acme".into(), 0.6, prov()),
            ..FieldSet::empty()
        };
        check_consistency(&Document::default(), &mut fields);
        assert!(fields.conflicts.is_empty());
        assert!((fields.title.confidence - 0.7).abs() < 1e-6);
    }
}
