//! Token classes used by the fidelity checks.

use std::collections::BTreeSet;

use crate::models::SectionKind;
use crate::pipeline::text::words;

/// Function words and sentence openers: capitalized, but carry no content.
const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "also", "an", "and", "any", "are", "as", "at", "be", "but", "by",
    "can", "do", "each", "for", "from", "has", "have", "he", "her", "here", "his", "how",
    "i", "if", "in", "into", "is", "it", "its", "join", "just", "may", "more", "most", "must",
    "no", "not", "of", "on", "or", "our", "she", "so", "such", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "up", "us", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "why", "will", "with", "would", "you",
    "your",
];

/// Lowercase words that carry posting content even when not capitalized.
const DOMAIN_KEYWORDS: &[&str] = &[
    "remote", "hybrid", "onsite", "salary", "bonus", "equity", "stock", "hourly", "annually",
    "yearly", "degree", "bachelor", "bachelors", "master", "masters", "phd", "senior", "junior",
    "lead", "principal", "staff", "intern", "internship", "contract", "temporary", "fulltime",
    "parttime", "years", "experience", "required", "preferred", "visa", "relocation",
];

pub fn is_stop_word(lower: &str) -> bool {
    STOP_WORDS.contains(&lower)
}

/// Whether a raw token is content-bearing: a number, a domain keyword, or
/// a capitalized non-stop word.
pub fn is_important(token: &str) -> bool {
    let lower = token.to_lowercase();
    if token.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    if DOMAIN_KEYWORDS.contains(&lower.as_str()) {
        return true;
    }
    token.chars().next().is_some_and(char::is_uppercase)
        && token.chars().count() > 1
        && !is_stop_word(&lower)
}

/// Lowercased important tokens of `text`.
pub fn important_tokens(text: &str) -> BTreeSet<String> {
    words(text)
        .filter(|w| is_important(w))
        .map(str::to_lowercase)
        .collect()
}

/// Tokens of the headers the pipeline inserts for synthesized sections.
pub fn canonical_header_tokens() -> BTreeSet<String> {
    SectionKind::CANONICAL_ORDER
        .iter()
        .chain(std::iter::once(&SectionKind::Unknown))
        .flat_map(|k| words(k.canonical_title()))
        .map(str::to_lowercase)
        .collect()
}
