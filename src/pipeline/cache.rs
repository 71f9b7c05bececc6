//! Optional memoization of analysis results, keyed by a content hash.
//! Lives outside the pipeline proper: analysis itself is stateless.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use base64::Engine;
use sha2::{Digest, Sha256};

use super::processor::AnalysisResult;
use crate::config::PIPELINE_VERSION;
use crate::models::Platform;
use crate::pipeline_config::CacheConfig;

/// Content hash of one analysis request. The pipeline version is part of
/// the key so a table change never serves stale results.
pub fn cache_key(platform: Option<Platform>, sanitized_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(PIPELINE_VERSION.as_bytes());
    hasher.update([0u8]);
    hasher.update(platform.map(|p| p.as_str()).unwrap_or("none").as_bytes());
    hasher.update([0u8]);
    hasher.update(sanitized_text.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

struct CacheEntry {
    result: AnalysisResult,
    inserted: Instant,
}

/// Bounded, expiring, thread-safe result cache.
pub struct AnalysisCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
    ttl: Duration,
}

impl AnalysisCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    /// Cached result for `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<AnalysisResult> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => {
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Store a result, evicting expired entries first and then the oldest.
    pub fn insert(&self, key: String, result: AnalysisResult) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!("Analysis cache lock poisoned, result not cached");
            return;
        };
        let ttl = self.ttl;
        entries.retain(|_, e| e.inserted.elapsed() < ttl);
        while entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, FieldSet, QualityReport};
    use crate::pipeline::oracle::OracleOutcome;

    fn result() -> AnalysisResult {
        AnalysisResult {
            document: Document::placeholders(),
            fields: FieldSet::empty(),
            quality: QualityReport::unrecoverable(),
            oracle: OracleOutcome::NotConfigured,
            pipeline_version: PIPELINE_VERSION.to_string(),
        }
    }

    #[test]
    fn key_depends_on_platform_and_text() {
        let a = cache_key(None, "Senior Engineer");
        assert_eq!(a, cache_key(None, "Senior Engineer"));
        assert_ne!(a, cache_key(Some(Platform::LinkedIn), "Senior Engineer"));
        assert_ne!(a, cache_key(None, "Senior Engineer."));
    }

    #[test]
    fn hit_after_insert() {
        let cache = AnalysisCache::new(4, Duration::from_secs(60));
        cache.insert("k".into(), result());
        assert_eq!(cache.get("k"), Some(result()));
        assert_eq!(cache.get("other"), None);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = AnalysisCache::new(4, Duration::ZERO);
        cache.insert("k".into(), result());
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = AnalysisCache::new(2, Duration::from_secs(60));
        cache.insert("a".into(), result());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".into(), result());
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c".into(), result());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }
}
