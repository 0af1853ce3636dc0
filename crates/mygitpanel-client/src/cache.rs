//! A small in-process ETag-aware response cache for the upstream
//! transport. Keyed by method + URL + sorted query params, so a
//! PR-list fetch and a PR-detail fetch never collide.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A previously-seen upstream response, kept so a conditional re-request
/// can send `If-None-Match` and, on a `304`, reuse `body` untouched.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: String,
    pub etag: Option<String>,
    pub status_code: u16,
}

#[derive(Debug, Clone)]
struct Entry {
    response: CachedResponse,
    cached_at: Instant,
}

fn cache_key(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_unstable();
    let query = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{method} {url}?{query}")
}

/// Kept below the shortest adaptive poll tier (2 minutes, schedule.rs)
/// so a scheduled poll never serves a response older than its own
/// cadence, while the handful of fetches within one poll cycle still
/// share a single response.
const DEFAULT_TTL: Duration = Duration::from_secs(90);

/// Process-local cache of upstream responses.
///
/// Not persisted across restarts — a cold cache just means the first
/// poll after startup pays full-body costs instead of getting `304`s.
/// Entries older than `ttl` are treated as misses rather than served
/// unconditionally stale.
#[derive(Debug)]
pub struct ApiCache {
    entries: HashMap<String, Entry>,
    ttl: Duration,
}

impl Default for ApiCache {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl ApiCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, method: &str, url: &str, params: &[(&str, &str)]) -> Option<&CachedResponse> {
        let entry = self.entries.get(&cache_key(method, url, params))?;
        if entry.cached_at.elapsed() >= self.ttl {
            return None;
        }
        Some(&entry.response)
    }

    pub fn set(&mut self, method: &str, url: &str, params: &[(&str, &str)], response: CachedResponse) {
        self.entries.insert(
            cache_key(method, url, params),
            Entry {
                response,
                cached_at: Instant::now(),
            },
        );
    }

    /// Invalidate every cached entry whose key contains `pattern`. Used
    /// after mutations so a subsequent read doesn't serve stale data for
    /// the endpoint the mutation just changed.
    pub fn invalidate_pattern(&mut self, pattern: &str) {
        self.entries.retain(|key, _| !key.contains(pattern));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut cache = ApiCache::new();
        cache.set(
            "GET",
            "/repos/o/r/pulls",
            &[("state", "open")],
            CachedResponse {
                body: "[]".to_string(),
                etag: Some("\"abc\"".to_string()),
                status_code: 200,
            },
        );
        let hit = cache.get("GET", "/repos/o/r/pulls", &[("state", "open")]);
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().body, "[]");
    }

    #[test]
    fn param_order_does_not_affect_key() {
        let mut cache = ApiCache::new();
        cache.set(
            "GET",
            "/repos/o/r/pulls",
            &[("state", "open"), ("head", "main")],
            CachedResponse {
                body: "[]".to_string(),
                etag: None,
                status_code: 200,
            },
        );
        let hit = cache.get("GET", "/repos/o/r/pulls", &[("head", "main"), ("state", "open")]);
        assert!(hit.is_some());
    }

    #[test]
    fn invalidate_pattern_removes_matching_entries_only() {
        let mut cache = ApiCache::new();
        cache.set(
            "GET",
            "/repos/o/r/pulls/1/comments",
            &[],
            CachedResponse {
                body: "[]".to_string(),
                etag: None,
                status_code: 200,
            },
        );
        cache.set(
            "GET",
            "/repos/o/r/pulls",
            &[("state", "open")],
            CachedResponse {
                body: "[]".to_string(),
                etag: None,
                status_code: 200,
            },
        );

        cache.invalidate_pattern("/repos/o/r/pulls/1/");

        assert!(cache.get("GET", "/repos/o/r/pulls/1/comments", &[]).is_none());
        assert!(cache
            .get("GET", "/repos/o/r/pulls", &[("state", "open")])
            .is_some());
    }

    #[test]
    fn entries_expire_after_their_ttl() {
        let mut cache = ApiCache::with_ttl(std::time::Duration::from_millis(10));
        cache.set(
            "GET",
            "/repos/o/r/pulls",
            &[],
            CachedResponse {
                body: "[]".to_string(),
                etag: None,
                status_code: 200,
            },
        );
        assert!(cache.get("GET", "/repos/o/r/pulls", &[]).is_some());

        std::thread::sleep(std::time::Duration::from_millis(25));
        assert!(cache.get("GET", "/repos/o/r/pulls", &[]).is_none());
    }
}
