//! Prompt construction. Document text is untrusted and is scrubbed of
//! injection attempts before it is placed into a prompt.

use serde::Deserialize;

use super::OracleError;
use crate::models::{Document, FieldName};

/// Maximum document text placed into one prompt (characters).
const MAX_PROMPT_DOCUMENT_CHARS: usize = 12_000;

pub const SYSTEM_PROMPT: &str = "You extract facts from job postings. \
Answer only with values copied verbatim from the posting. \
If a value is not stated, use null. Never guess.";

/// Values proposed by the oracle. Missing keys mean "no proposal".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracleProposal {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub location: Option<String>,
}

impl OracleProposal {
    pub fn value(&self, field: FieldName) -> Option<&str> {
        match field {
            FieldName::Title => self.title.as_deref(),
            FieldName::Organization => self.organization.as_deref(),
            FieldName::Location => self.location.as_deref(),
            _ => None,
        }
    }
}

fn is_role_marker(trimmed: &str) -> bool {
    [
        "system:",
        "assistant:",
        "user:",
        "[system]",
        "[assistant]",
        "[inst]",
        "[/inst]",
        "<<sys>>",
        "note to ai:",
        "instructions:",
        "system update:",
    ]
    .iter()
    .any(|marker| trimmed.starts_with(marker))
}

fn is_override_attempt(text: &str) -> bool {
    [
        "ignore previous instructions",
        "ignore all instructions",
        "ignore the above instructions",
        "disregard your instructions",
        "disregard all instructions",
        "forget your instructions",
        "new instructions:",
        "override:",
    ]
    .iter()
    .any(|phrase| text.contains(phrase))
}

fn is_instruction_tag(trimmed: &str) -> bool {
    ["<instruction", "</instruction", "<system", "</system", "</posting"]
        .iter()
        .any(|tag| trimmed.starts_with(tag))
}

fn is_injection(lower: &str) -> bool {
    is_role_marker(lower) || is_override_attempt(lower) || is_instruction_tag(lower)
}

/// Drop lines that try to steer the oracle. An attempt split across two
/// lines drops both. Returns the cleaned text and the removed line count.
pub fn sanitize_for_prompt(text: &str) -> (String, usize) {
    let lines: Vec<&str> = text.lines().collect();
    let lowered: Vec<String> = lines.iter().map(|l| l.trim().to_lowercase()).collect();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut removed = 0usize;
    let mut skip_next = false;

    for (i, line) in lines.iter().enumerate() {
        if skip_next {
            skip_next = false;
            removed += 1;
            continue;
        }
        if is_injection(&lowered[i]) {
            removed += 1;
            continue;
        }
        if let Some(next) = lowered.get(i + 1) {
            if !is_injection(next) && is_override_attempt(&format!("{} {}", lowered[i], next)) {
                skip_next = true;
                removed += 1;
                continue;
            }
        }
        kept.push(line);
    }

    let mut cleaned = kept.join("\n");
    if let Some((cut, _)) = cleaned.char_indices().nth(MAX_PROMPT_DOCUMENT_CHARS) {
        cleaned.truncate(cut);
    }
    (cleaned, removed)
}

/// Prompt asking for the `targets` fields of `doc`.
pub fn build_prompt(doc: &Document, targets: &[FieldName]) -> String {
    let mut text = String::new();
    for section in doc.sections.iter().filter(|s| s.has_content()) {
        text.push_str(&section.title);
        text.push('\n');
        text.push_str(&section.body);
        text.push_str("\n\n");
    }
    let (document, removed) = sanitize_for_prompt(&text);
    if removed > 0 {
        tracing::warn!(removed_lines = removed, "Injection patterns removed from oracle prompt");
    }

    let keys: Vec<&str> = targets.iter().map(|f| f.as_str()).collect();
    format!(
        "Read the job posting between the <posting> tags and return a JSON object \
with the keys {keys:?}. Each value must be copied verbatim from the posting, or null.\n\
Respond with a ```json code block only.\n\n<posting>\n{document}\n</posting>"
    )
}

/// Extract and parse the JSON object in an oracle response. A fenced
/// ```json block is preferred; otherwise the outermost braces are used.
pub fn parse_response(response: &str) -> Result<OracleProposal, OracleError> {
    let json = match response.find("```json") {
        Some(start) => {
            let body = &response[start + 7..];
            let end = body
                .find("```")
                .ok_or_else(|| OracleError::MalformedResponse("Unclosed JSON block".into()))?;
            &body[..end]
        }
        None => {
            let start = response
                .find('{')
                .ok_or_else(|| OracleError::MalformedResponse("No JSON object found".into()))?;
            let end = response
                .rfind('}')
                .filter(|end| *end > start)
                .ok_or_else(|| OracleError::MalformedResponse("Unclosed JSON object".into()))?;
            &response[start..=end]
        }
    };
    serde_json::from_str(json.trim()).map_err(|e| OracleError::MalformedResponse(e.to_string()))
}
