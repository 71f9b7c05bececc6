use serde::{Deserialize, Serialize};

use super::enums::{
    Currency, EmploymentType, ExperienceBasis, ExperienceLevel, FieldName, FieldOrigin,
    LocationFlexibility, PayPeriod, SectionKind,
};

/// Pointer from an extracted value back into the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub section: SectionKind,
    /// Source text the value was read from.
    pub snippet: String,
    pub origin: FieldOrigin,
}

impl Provenance {
    pub fn pattern(section: SectionKind, snippet: impl Into<String>) -> Self {
        Self {
            section,
            snippet: snippet.into(),
            origin: FieldOrigin::Pattern,
        }
    }
}

/// One extracted field. Absent fields have no value and confidence 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field<T> {
    pub value: Option<T>,
    pub confidence: f32,
    pub provenance: Option<Provenance>,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::absent()
    }
}

impl<T> Field<T> {
    pub fn absent() -> Self {
        Self {
            value: None,
            confidence: 0.0,
            provenance: None,
        }
    }

    pub fn extracted(value: T, confidence: f32, provenance: Provenance) -> Self {
        Self {
            value: Some(value),
            confidence: confidence.clamp(0.0, 1.0),
            provenance: Some(provenance),
        }
    }

    /// Fallback value with no source in the document.
    pub fn defaulted(value: T, confidence: f32) -> Self {
        Self {
            value: Some(value),
            confidence: confidence.clamp(0.0, 1.0),
            provenance: None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Present and traceable to the document (defaults do not count).
    pub fn is_extracted(&self) -> bool {
        self.value.is_some() && self.provenance.is_some()
    }

    /// Lower confidence by `factor`; never raises it.
    pub fn reduce_confidence(&mut self, factor: f32) {
        self.confidence *= factor.clamp(0.0, 1.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    pub min: f64,
    pub max: f64,
    pub currency: Currency,
    pub period: PayPeriod,
    /// Period guessed from magnitude rather than stated.
    pub period_inferred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub min_years: Option<u32>,
    pub max_years: Option<u32>,
    pub level: ExperienceLevel,
    pub basis: ExperienceBasis,
}

/// A cross-field contradiction, resolved by lowering confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyConflict {
    pub fields: Vec<FieldName>,
    pub reason: String,
    pub factor: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldSet {
    pub title: Field<String>,
    pub organization: Field<String>,
    pub location: Field<String>,
    pub location_flexibility: Field<LocationFlexibility>,
    pub compensation: Field<Compensation>,
    pub experience: Field<Experience>,
    pub employment_type: Field<EmploymentType>,
    pub conflicts: Vec<ConsistencyConflict>,
}

impl FieldSet {
    /// Every field absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_extracted(&self, name: FieldName) -> bool {
        match name {
            FieldName::Title => self.title.is_extracted(),
            FieldName::Organization => self.organization.is_extracted(),
            FieldName::Location => self.location.is_extracted(),
            FieldName::LocationFlexibility => self.location_flexibility.is_extracted(),
            FieldName::Compensation => self.compensation.is_extracted(),
            FieldName::Experience => self.experience.is_extracted(),
            FieldName::EmploymentType => self.employment_type.is_extracted(),
        }
    }

    pub fn confidence(&self, name: FieldName) -> f32 {
        match name {
            FieldName::Title => self.title.confidence,
            FieldName::Organization => self.organization.confidence,
            FieldName::Location => self.location.confidence,
            FieldName::LocationFlexibility => self.location_flexibility.confidence,
            FieldName::Compensation => self.compensation.confidence,
            FieldName::Experience => self.experience.confidence,
            FieldName::EmploymentType => self.employment_type.confidence,
        }
    }

    pub fn reduce_confidence(&mut self, name: FieldName, factor: f32) {
        match name {
            FieldName::Title => self.title.reduce_confidence(factor),
            FieldName::Organization => self.organization.reduce_confidence(factor),
            FieldName::Location => self.location.reduce_confidence(factor),
            FieldName::LocationFlexibility => self.location_flexibility.reduce_confidence(factor),
            FieldName::Compensation => self.compensation.reduce_confidence(factor),
            FieldName::Experience => self.experience.reduce_confidence(factor),
            FieldName::EmploymentType => self.employment_type.reduce_confidence(factor),
        }
    }

    /// Record a contradiction and lower every involved field.
    pub fn record_conflict(&mut self, fields: Vec<FieldName>, reason: impl Into<String>, factor: f32) {
        for name in &fields {
            self.reduce_confidence(*name, factor);
        }
        self.conflicts.push(ConsistencyConflict {
            fields,
            reason: reason.into(),
            factor,
        });
    }

    /// Free-text values and provenance snippets, for grounding checks.
    pub fn text_values(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for field in [&self.title, &self.organization, &self.location] {
            if let Some(v) = &field.value {
                out.push(v.as_str());
            }
        }
        let provenances = [
            self.title.provenance.as_ref(),
            self.organization.provenance.as_ref(),
            self.location.provenance.as_ref(),
            self.location_flexibility.provenance.as_ref(),
            self.compensation.provenance.as_ref(),
            self.experience.provenance.as_ref(),
            self.employment_type.provenance.as_ref(),
        ];
        out.extend(provenances.into_iter().flatten().map(|p| p.snippet.as_str()));
        out
    }

    /// Comparable string rendering of every field, used for baseline diffs.
    pub fn snapshot(&self) -> Vec<(FieldName, Option<String>)> {
        FieldName::ALL
            .iter()
            .map(|name| (*name, self.render(*name)))
            .collect()
    }

    fn render(&self, name: FieldName) -> Option<String> {
        match name {
            FieldName::Title => self.title.value.clone(),
            FieldName::Organization => self.organization.value.clone(),
            FieldName::Location => self.location.value.clone(),
            FieldName::LocationFlexibility => self
                .location_flexibility
                .value
                .map(|v| v.as_str().to_string()),
            FieldName::Compensation => self.compensation.value.as_ref().map(|c| {
                format!("{} {} {} {}", c.min, c.max, c.currency, c.period)
            }),
            FieldName::Experience => self.experience.value.as_ref().map(|e| {
                format!(
                    "{} {} {}",
                    e.min_years.map(|y| y.to_string()).unwrap_or_default(),
                    e.max_years.map(|y| y.to_string()).unwrap_or_default(),
                    e.level
                )
            }),
            FieldName::EmploymentType => {
                self.employment_type.value.map(|v| v.as_str().to_string())
            }
        }
    }
}
