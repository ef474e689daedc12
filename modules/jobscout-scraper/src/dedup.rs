//! In-memory dedup cache guarding against reprocessing the same job URL.
//!
//! Best effort only: the cache lives for one run and the check-then-mark
//! pattern is not atomic across the persist batch. True uniqueness is
//! enforced by the store's unique URL constraint.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

pub struct DedupCache {
    seen: Mutex<HashSet<u64>>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Whether this URL has already been seen this run.
    pub fn seen(&self, url: &str) -> bool {
        let key = url_hash(url);
        self.seen.lock().expect("dedup lock").contains(&key)
    }

    /// Mark a URL as seen. Returns false if it was already marked, which is
    /// the signal callers use to close the check/persist race window.
    pub fn mark(&self, url: &str) -> bool {
        let key = url_hash(url);
        self.seen.lock().expect("dedup lock").insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("dedup lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.seen.lock().expect("dedup lock").clear();
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

/// 64-bit hash of the normalized URL. Not cryptographic; the cache is
/// per-run so cross-process stability does not matter.
pub fn url_hash(url: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    normalize_url(url).hash(&mut hasher);
    hasher.finish()
}

/// Strip tracking parameters and normalize casing/trailing slash so the
/// same job posting hashes identically regardless of how we reached it.
pub fn normalize_url(url: &str) -> String {
    const TRACKING_PARAMS: &[&str] = &[
        "refId", "trackingId", "trk", "fbclid", "gclid", "utm_source", "utm_medium",
        "utm_campaign", "utm_term", "utm_content", "ref",
    ];

    let Ok(mut parsed) = url::Url::parse(url) else {
        return url.trim_end_matches('/').to_string();
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let clean_pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if clean_pairs.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(clean_pairs);
        }
    }

    parsed.to_string().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_then_seen_round_trips() {
        let cache = DedupCache::new();
        let url = "https://www.linkedin.com/jobs/view/1234567890";
        assert!(!cache.seen(url));
        assert!(cache.mark(url));
        assert!(cache.seen(url));
    }

    #[test]
    fn second_mark_reports_already_seen() {
        let cache = DedupCache::new();
        assert!(cache.mark("https://example.com/jobs/1"));
        assert!(!cache.mark("https://example.com/jobs/1"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn tracking_params_do_not_defeat_dedup() {
        let cache = DedupCache::new();
        cache.mark("https://www.linkedin.com/jobs/view/99?refId=abc&trackingId=xyz");
        assert!(cache.seen("https://www.linkedin.com/jobs/view/99"));
        assert!(cache.seen("https://www.linkedin.com/jobs/view/99/"));
    }

    #[test]
    fn meaningful_query_params_are_kept() {
        assert_ne!(
            url_hash("https://example.com/jobs?page=1"),
            url_hash("https://example.com/jobs?page=2"),
        );
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = DedupCache::new();
        cache.mark("https://example.com/jobs/1");
        cache.mark("https://example.com/jobs/2");
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
