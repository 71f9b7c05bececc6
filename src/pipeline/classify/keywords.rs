//! Per-kind keyword tables. Plain data: matching lives in `scoring`.
//!
//! Phrases are written naturally and normalized at comparison time
//! (lowercase, punctuation stripped), so "what you'll do" also matches
//! "WHAT YOU'LL DO:".

use crate::models::SectionKind;

/// Version tag of the keyword and pattern tables.
pub const TABLE_VERSION: &str = "tables.3";

#[derive(Debug)]
pub struct KindKeywords {
    pub kind: SectionKind,
    /// Header phrases for this kind.
    pub titles: &'static [&'static str],
    /// Words and phrases typical of the section body.
    pub body: &'static [&'static str],
    /// Typical relative position of the section in a posting, 0 = top.
    pub expected_position: f32,
}

pub static KEYWORD_TABLE: [KindKeywords; 7] = [
    KindKeywords {
        kind: SectionKind::Metadata,
        titles: &[
            "job details",
            "job information",
            "job info",
            "position details",
            "position information",
            "at a glance",
            "key details",
            "job summary details",
        ],
        body: &[
            "location",
            "job type",
            "employment type",
            "full time",
            "part time",
            "remote",
            "hybrid",
            "posted",
            "department",
            "job id",
            "req id",
            "schedule",
            "seniority level",
        ],
        expected_position: 0.0,
    },
    KindKeywords {
        kind: SectionKind::Overview,
        titles: &[
            "overview",
            "job overview",
            "about the role",
            "about the job",
            "about this role",
            "about the position",
            "job description",
            "description",
            "summary",
            "job summary",
            "position summary",
            "the role",
            "role overview",
            "introduction",
            "the opportunity",
        ],
        body: &[
            "looking for",
            "seeking",
            "this role",
            "the role",
            "you will",
            "opportunity",
            "join",
            "team",
            "position",
            "we are hiring",
        ],
        expected_position: 0.10,
    },
    KindKeywords {
        kind: SectionKind::Responsibilities,
        titles: &[
            "responsibilities",
            "key responsibilities",
            "duties",
            "job duties",
            "what you'll do",
            "what you will do",
            "what you will be doing",
            "your role",
            "day to day",
            "essential functions",
            "the work",
        ],
        body: &[
            "develop",
            "design",
            "build",
            "manage",
            "lead",
            "collaborate",
            "maintain",
            "implement",
            "own",
            "drive",
            "support",
            "ensure",
            "work with",
            "responsible",
        ],
        expected_position: 0.35,
    },
    KindKeywords {
        kind: SectionKind::Qualifications,
        titles: &[
            "qualifications",
            "requirements",
            "required qualifications",
            "preferred qualifications",
            "minimum qualifications",
            "basic qualifications",
            "what you bring",
            "who you are",
            "skills",
            "required skills",
            "what we're looking for",
            "nice to have",
            "experience",
            "education",
            "must have",
        ],
        body: &[
            "years",
            "experience",
            "degree",
            "bachelor",
            "master",
            "required",
            "preferred",
            "skills",
            "proficiency",
            "proficient",
            "knowledge",
            "familiarity",
            "ability to",
            "certification",
        ],
        expected_position: 0.55,
    },
    KindKeywords {
        kind: SectionKind::Compensation,
        titles: &[
            "compensation",
            "salary",
            "pay",
            "benefits",
            "compensation and benefits",
            "salary and benefits",
            "perks",
            "perks and benefits",
            "what we offer",
            "pay range",
            "salary range",
            "total rewards",
        ],
        body: &[
            "salary",
            "per hour",
            "per year",
            "bonus",
            "equity",
            "stock",
            "401k",
            "pto",
            "paid time off",
            "health",
            "dental",
            "vision",
            "insurance",
            "benefits",
            "compensation",
        ],
        expected_position: 0.75,
    },
    KindKeywords {
        kind: SectionKind::CompanyInfo,
        titles: &[
            "about us",
            "about the company",
            "about",
            "company",
            "who we are",
            "our company",
            "our mission",
            "company overview",
            "why join us",
            "culture",
            "our story",
        ],
        body: &[
            "founded",
            "mission",
            "we are",
            "our team",
            "headquartered",
            "customers",
            "employees",
            "company",
            "culture",
            "values",
            "industry",
        ],
        expected_position: 0.80,
    },
    KindKeywords {
        kind: SectionKind::LegalCompliance,
        titles: &[
            "equal opportunity",
            "equal employment opportunity",
            "eeo",
            "eeo statement",
            "legal",
            "disclaimer",
            "accommodations",
            "diversity",
            "privacy",
            "e-verify",
        ],
        body: &[
            "equal opportunity",
            "employer",
            "race",
            "gender",
            "religion",
            "disability",
            "veteran",
            "sexual orientation",
            "national origin",
            "accommodation",
            "discriminate",
            "e verify",
            "protected",
        ],
        expected_position: 0.95,
    },
];

/// Keyword table for a canonical kind. `Unknown` has none.
pub fn keywords_for(kind: SectionKind) -> Option<&'static KindKeywords> {
    KEYWORD_TABLE.iter().find(|k| k.kind == kind)
}
