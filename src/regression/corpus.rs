//! Regression corpus: a JSON array of cases, or a directory of one-case
//! JSON files.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::RegressionError;
use crate::models::{Platform, RawDocument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusCase {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl CorpusCase {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            platform: None,
            source_url: None,
        }
    }

    pub fn to_raw(&self) -> RawDocument {
        let mut raw = RawDocument::new(self.text.clone());
        if let Some(platform) = self.platform {
            raw = raw.with_platform(platform);
        }
        if let Some(url) = &self.source_url {
            raw = raw.with_source_url(url.clone());
        }
        raw
    }
}

/// Load and sort a corpus by case id. Duplicate ids are rejected.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusCase>, RegressionError> {
    let mut cases = if path.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        let mut cases = Vec::with_capacity(files.len());
        for file in files {
            let raw = std::fs::read_to_string(&file)?;
            let case: CorpusCase = serde_json::from_str(&raw).map_err(|e| {
                RegressionError::Corpus(format!("{}: {e}", file.display()))
            })?;
            cases.push(case);
        }
        cases
    } else {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str::<Vec<CorpusCase>>(&raw)
            .map_err(|e| RegressionError::Corpus(format!("{}: {e}", path.display())))?
    };

    if cases.is_empty() {
        return Err(RegressionError::EmptyCorpus);
    }
    cases.sort_by(|a, b| a.id.cmp(&b.id));
    let mut seen = BTreeSet::new();
    for case in &cases {
        if !seen.insert(case.id.as_str()) {
            return Err(RegressionError::Corpus(format!("duplicate case id {}", case.id)));
        }
    }
    tracing::info!(cases = cases.len(), path = %path.display(), "Loaded regression corpus");
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_array_file_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[{"id": "b", "text": "Engineer"}, {"id": "a", "text": "Analyst", "platform": "linkedin"}]"#,
        )
        .unwrap();

        let cases = load_corpus(&path).unwrap();
        assert_eq!(cases[0].id, "a");
        assert_eq!(cases[0].platform, Some(Platform::LinkedIn));
        assert_eq!(cases[1].platform, None);
    }

    #[test]
    fn loads_directory_of_cases() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.json"), r#"{"id": "one", "text": "A"}"#).unwrap();
        std::fs::write(dir.path().join("two.json"), r#"{"id": "two", "text": "B"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let cases = load_corpus(dir.path()).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].id, "two");
    }

    #[test]
    fn duplicate_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, r#"[{"id": "a", "text": "x"}, {"id": "a", "text": "y"}]"#).unwrap();
        assert!(matches!(load_corpus(&path), Err(RegressionError::Corpus(_))));
    }

    #[test]
    fn empty_corpus_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(load_corpus(&path), Err(RegressionError::EmptyCorpus)));
    }

    #[test]
    fn source_url_sets_platform() {
        let case = CorpusCase {
            source_url: Some("https://www.indeed.com/viewjob?jk=1".into()),
            ..CorpusCase::new("a", "text")
        };
        assert_eq!(case.to_raw().platform(), Some(Platform::Indeed));
    }
}
