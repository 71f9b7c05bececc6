use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use str_enum;

str_enum!(
    /// Semantic section of a job posting. Declaration order is the canonical
    /// document order; `Unknown` always sorts last.
    SectionKind {
        Metadata => "metadata",
        Overview => "overview",
        Responsibilities => "responsibilities",
        Qualifications => "qualifications",
        Compensation => "compensation",
        CompanyInfo => "company_info",
        LegalCompliance => "legal_compliance",
        Unknown => "unknown",
    }
);

impl SectionKind {
    /// Canonical priority list used by the document assembler.
    pub const CANONICAL_ORDER: [SectionKind; 7] = [
        SectionKind::Metadata,
        SectionKind::Overview,
        SectionKind::Responsibilities,
        SectionKind::Qualifications,
        SectionKind::Compensation,
        SectionKind::CompanyInfo,
        SectionKind::LegalCompliance,
    ];

    /// Kinds that every finalized document contains.
    pub const REQUIRED: [SectionKind; 4] = [
        SectionKind::Metadata,
        SectionKind::Overview,
        SectionKind::Responsibilities,
        SectionKind::Qualifications,
    ];

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Position in the canonical order; non-canonical kinds rank after all others.
    pub fn canonical_rank(self) -> usize {
        Self::CANONICAL_ORDER
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::CANONICAL_ORDER.len())
    }

    /// Header inserted when the pipeline synthesizes this section.
    pub fn canonical_title(self) -> &'static str {
        match self {
            SectionKind::Metadata => "Job Details",
            SectionKind::Overview => "Overview",
            SectionKind::Responsibilities => "Responsibilities",
            SectionKind::Qualifications => "Qualifications",
            SectionKind::Compensation => "Compensation",
            SectionKind::CompanyInfo => "About the Company",
            SectionKind::LegalCompliance => "Legal & Compliance",
            SectionKind::Unknown => "Other",
        }
    }
}

str_enum!(
    /// Source platform of a posting.
    Platform {
        LinkedIn => "linkedin",
        Indeed => "indeed",
        Glassdoor => "glassdoor",
        CompanyCareers => "company",
        Other => "other",
    }
);

impl Platform {
    /// Classify a posting URL by hostname and path.
    pub fn from_url(url: &str) -> Platform {
        let Ok(parsed) = reqwest::Url::parse(url.trim()) else {
            return Platform::Other;
        };
        let host = parsed.host_str().unwrap_or_default().to_lowercase();
        let path = parsed.path().to_lowercase();

        if host.contains("linkedin") {
            Platform::LinkedIn
        } else if host.contains("indeed") {
            Platform::Indeed
        } else if host.contains("glassdoor") {
            Platform::Glassdoor
        } else if host.starts_with("careers.")
            || host.contains(".careers.")
            || path.contains("/careers")
            || path.contains("/jobs")
        {
            Platform::CompanyCareers
        } else {
            Platform::Other
        }
    }

    /// Prior confidence that text from this platform parses cleanly.
    pub fn parse_confidence(self) -> f32 {
        match self {
            Platform::LinkedIn => 0.85,
            Platform::Indeed => 0.75,
            Platform::Glassdoor => 0.70,
            Platform::CompanyCareers => 0.80,
            Platform::Other => 0.60,
        }
    }

    /// Known platforms render consistent section headers.
    pub fn is_high_structure(self) -> bool {
        !matches!(self, Platform::Other)
    }
}

str_enum!(
    /// How flexible the work location is, in precedence order.
    LocationFlexibility {
        Fixed => "fixed",
        FlexibleRegion => "flexible_region",
        Nationwide => "nationwide",
        RemoteAllowed => "remote_allowed",
        FullyRemote => "fully_remote",
    }
);

str_enum!(ExperienceLevel {
    Entry => "entry",
    Mid => "mid",
    Senior => "senior",
    Executive => "executive",
    Mixed => "mixed",
});

str_enum!(PayPeriod {
    Hourly => "hourly",
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
    Unspecified => "unspecified",
});

str_enum!(Currency {
    Usd => "USD",
    Eur => "EUR",
    Gbp => "GBP",
    Cad => "CAD",
    Aud => "AUD",
    Inr => "INR",
    Unknown => "unknown",
});

str_enum!(EmploymentType {
    FullTime => "full_time",
    PartTime => "part_time",
    Contract => "contract",
    Temporary => "temporary",
    Internship => "internship",
});

str_enum!(
    /// Boundary detector pattern family that produced a candidate.
    PatternFamily {
        ExplicitHeader => "explicit_header",
        BoldEmphasis => "bold_emphasis",
        ColonTerminated => "colon_terminated",
        AllCaps => "all_caps",
    }
);

str_enum!(
    /// List-item pattern that produced a label/description pair.
    ItemPattern {
        BoldLabelColon => "bold_label_colon",
        BulletColon => "bullet_colon",
        CapitalizedColon => "capitalized_colon",
    }
);

str_enum!(
    /// Fields produced by the field extractor.
    FieldName {
        Title => "title",
        Organization => "organization",
        Location => "location",
        LocationFlexibility => "location_flexibility",
        Compensation => "compensation",
        Experience => "experience",
        EmploymentType => "employment_type",
    }
);

impl FieldName {
    pub const ALL: [FieldName; 7] = [
        FieldName::Title,
        FieldName::Organization,
        FieldName::Location,
        FieldName::LocationFlexibility,
        FieldName::Compensation,
        FieldName::Experience,
        FieldName::EmploymentType,
    ];

    /// Required fields weigh double in the completeness score.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            FieldName::Title | FieldName::Organization | FieldName::LocationFlexibility
        )
    }
}

str_enum!(
    /// Which step produced a field value.
    FieldOrigin {
        Pattern => "pattern",
        Oracle => "oracle",
    }
);

str_enum!(
    /// What the experience requirement was derived from, in precedence order.
    ExperienceBasis {
        NumericRange => "numeric_range",
        LevelKeyword => "level_keyword",
        Default => "default",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn section_kind_round_trips_through_str() {
        for kind in SectionKind::CANONICAL_ORDER {
            assert_eq!(SectionKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(SectionKind::from_str("benefits").is_err());
    }

    #[test]
    fn unknown_ranks_last() {
        assert_eq!(SectionKind::Metadata.canonical_rank(), 0);
        assert_eq!(SectionKind::LegalCompliance.canonical_rank(), 6);
        assert_eq!(SectionKind::Unknown.canonical_rank(), 7);
    }

    #[test]
    fn required_kinds() {
        assert!(SectionKind::Metadata.is_required());
        assert!(SectionKind::Qualifications.is_required());
        assert!(!SectionKind::Compensation.is_required());
        assert!(!SectionKind::Unknown.is_required());
    }

    #[test]
    fn platform_from_url() {
        assert_eq!(
            Platform::from_url("https://www.linkedin.com/jobs/view/123"),
            Platform::LinkedIn
        );
        assert_eq!(Platform::from_url("https://uk.indeed.com/viewjob?jk=1"), Platform::Indeed);
        assert_eq!(
            Platform::from_url("https://www.glassdoor.com/job-listing/x"),
            Platform::Glassdoor
        );
        assert_eq!(
            Platform::from_url("https://careers.example.com/role/42"),
            Platform::CompanyCareers
        );
        assert_eq!(
            Platform::from_url("https://example.com/jobs/42"),
            Platform::CompanyCareers
        );
        assert_eq!(Platform::from_url("https://example.com/blog"), Platform::Other);
        assert_eq!(Platform::from_url("not a url"), Platform::Other);
    }

    #[test]
    fn platform_confidence_priors() {
        assert!(Platform::LinkedIn.parse_confidence() > Platform::Other.parse_confidence());
        assert!(Platform::Glassdoor.is_high_structure());
        assert!(!Platform::Other.is_high_structure());
    }

    #[test]
    fn enums_serialize_as_their_str() {
        let json = serde_json::to_string(&LocationFlexibility::FullyRemote).unwrap();
        assert_eq!(json, "\"fully_remote\"");
        let json = serde_json::to_string(&Platform::LinkedIn).unwrap();
        assert_eq!(json, "\"linkedin\"");
        let back: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(back, Currency::Eur);
    }
}
