use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{section_lines, snippet};
use crate::models::{Compensation, Currency, Document, Field, PayPeriod, Provenance, SectionKind};

/// Yearly amounts start here when the period is not stated.
const YEARLY_MAGNITUDE: f64 = 10_000.0;
/// Amounts up to here read as hourly when the period is not stated.
const HOURLY_MAGNITUDE: f64 = 300.0;

const SEARCH_ORDER: [SectionKind; 4] = [
    SectionKind::Compensation,
    SectionKind::Metadata,
    SectionKind::Overview,
    SectionKind::Unknown,
];

static PAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?P<cur1>c\$|a\$|[$€£₹]|\b(?:usd|eur|gbp|cad|aud|inr)\b)?\s*
        (?P<min>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(?P<k1>k\b)?
        (?:
            \s*(?:-|–|—|\bto\b)\s*
            (?P<cur2>c\$|a\$|[$€£₹])?\s*
            (?P<max>\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s*(?P<k2>k\b)?
        )?
        \s*(?P<code>\b(?:usd|eur|gbp|cad|aud|inr)\b)?
        \s*(?P<period>
            (?:/|\bper\s+|\ban?\s+)\s*(?:hour|hr|day|week|wk|month|mo|year|yr|annum)\b
            |\b(?:hourly|daily|weekly|monthly|yearly|annually)\b
        )?",
    )
    .unwrap()
});

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse().ok()
}

fn currency_of(marker: &str) -> Currency {
    match marker.to_lowercase().as_str() {
        "$" | "usd" => Currency::Usd,
        "€" | "eur" => Currency::Eur,
        "£" | "gbp" => Currency::Gbp,
        "c$" | "cad" => Currency::Cad,
        "a$" | "aud" => Currency::Aud,
        "₹" | "inr" => Currency::Inr,
        _ => Currency::Unknown,
    }
}

fn period_of(raw: &str) -> PayPeriod {
    let unit = raw
        .trim_start_matches('/')
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_lowercase();
    match unit.as_str() {
        "hour" | "hr" | "hourly" => PayPeriod::Hourly,
        "day" | "daily" => PayPeriod::Daily,
        "week" | "wk" | "weekly" => PayPeriod::Weekly,
        "month" | "mo" | "monthly" => PayPeriod::Monthly,
        "year" | "yr" | "annum" | "yearly" | "annually" => PayPeriod::Yearly,
        _ => PayPeriod::Unspecified,
    }
}

/// Build a compensation value from one match. Numbers without a currency
/// marker or a stated period are not pay.
fn parse_match(caps: &Captures<'_>) -> Option<(Compensation, bool)> {
    let marker = caps
        .name("cur1")
        .or_else(|| caps.name("cur2"))
        .or_else(|| caps.name("code"))
        .map(|m| m.as_str());
    let period = caps.name("period").map(|m| period_of(m.as_str()));
    if marker.is_none() && period.is_none() {
        return None;
    }

    let mut min = parse_amount(caps.name("min")?.as_str())?;
    let max_raw = caps.name("max").and_then(|m| parse_amount(m.as_str()));
    let k1 = caps.name("k1").is_some();
    let k2 = caps.name("k2").is_some();
    if k1 {
        min *= 1000.0;
    }
    let is_range = max_raw.is_some();
    let mut max = match max_raw {
        Some(v) if k2 || k1 => v * 1000.0,
        Some(v) => v,
        None => min,
    };
    // "$120-150k": the suffix applies to both ends.
    if k2 && !k1 && min < 1000.0 {
        min *= 1000.0;
    }
    if max < min {
        std::mem::swap(&mut min, &mut max);
    }
    if min <= 0.0 {
        return None;
    }

    let currency = marker.map(currency_of).unwrap_or(Currency::Unknown);
    let (period, inferred) = match period {
        Some(p) => (p, false),
        None if max >= YEARLY_MAGNITUDE => (PayPeriod::Yearly, true),
        None if max <= HOURLY_MAGNITUDE => (PayPeriod::Hourly, true),
        None => (PayPeriod::Unspecified, false),
    };
    Some((
        Compensation {
            min,
            max,
            currency,
            period,
            period_inferred: inferred,
        },
        is_range,
    ))
}

/// Pay range or single value with currency and period, from the first
/// section in search order that states one.
pub fn extract_compensation(doc: &Document) -> Field<Compensation> {
    for kind in SEARCH_ORDER {
        for line in section_lines(doc, kind) {
            for caps in PAY.captures_iter(line) {
                let Some((comp, is_range)) = parse_match(&caps) else {
                    continue;
                };
                let stated_period = !comp.period_inferred && comp.period != PayPeriod::Unspecified;
                let confidence = match (is_range, stated_period) {
                    (true, true) => 0.9,
                    (true, false) => 0.75,
                    (false, true) => 0.7,
                    (false, false) => 0.6,
                };
                return Field::extracted(comp, confidence, Provenance::pattern(kind, snippet(line)));
            }
        }
    }
    Field::absent()
}
