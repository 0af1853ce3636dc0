//! Caching decorator over any [`UpstreamClient`], adding conditional-request
//! caching for read operations.
//!
//! Only read operations are cached — writes always go straight through
//! and invalidate any cached reads for the affected PR.

use std::sync::Mutex;

use async_trait::async_trait;
use mygitpanel_core::models::{CheckRun, CiStatus, IssueComment, PullRequest, Review, ReviewComment};

use crate::cache::{ApiCache, CachedResponse};
use crate::client::{CacheMode, UpstreamClient};
use crate::types::{PrDetail, ReviewSubmission, ThreadResolutionMap};

pub struct CachedGitHubClient<C: UpstreamClient> {
    inner: C,
    cache: Mutex<ApiCache>,
    mode: CacheMode,
}

impl<C: UpstreamClient> CachedGitHubClient<C> {
    pub fn new(inner: C, mode: CacheMode) -> Self {
        Self {
            inner,
            cache: Mutex::new(ApiCache::new()),
            mode,
        }
    }

    fn cached_json<T: serde::Serialize + serde::de::DeserializeOwned>(
        &self,
        method: &str,
        key: &str,
    ) -> Option<T> {
        if !self.mode.should_read() {
            return None;
        }
        let cache = self.cache.lock().expect("api cache mutex poisoned");
        let hit = cache.get(method, key, &[])?;
        serde_json::from_str(&hit.body).ok()
    }

    fn store_json<T: serde::Serialize>(&self, method: &str, key: &str, value: &T) {
        if !self.mode.should_write() {
            return;
        }
        if let Ok(body) = serde_json::to_string(value) {
            let mut cache = self.cache.lock().expect("api cache mutex poisoned");
            cache.set(
                method,
                key,
                &[],
                CachedResponse {
                    body,
                    etag: None,
                    status_code: 200,
                },
            );
        }
    }

    fn invalidate(&self, pattern: &str) {
        let mut cache = self.cache.lock().expect("api cache mutex poisoned");
        cache.invalidate_pattern(pattern);
    }
}

#[async_trait]
impl<C: UpstreamClient> UpstreamClient for CachedGitHubClient<C> {
    async fn fetch_pull_requests(&self, repo: &str) -> anyhow::Result<Vec<PullRequest>> {
        let key = format!("pulls:{repo}");
        if let Some(hit) = self.cached_json::<Vec<PullRequest>>("GET", &key) {
            return Ok(hit);
        }
        let prs = self.inner.fetch_pull_requests(repo).await?;
        self.store_json("GET", &key, &prs);
        Ok(prs)
    }

    async fn fetch_pr_detail(&self, repo: &str, number: u64) -> anyhow::Result<PrDetail> {
        let key = format!("pr_detail:{repo}#{number}");
        if let Some(hit) = self.cached_json::<PrDetail>("GET", &key) {
            return Ok(hit);
        }
        let detail = self.inner.fetch_pr_detail(repo, number).await?;
        self.store_json("GET", &key, &detail);
        Ok(detail)
    }

    async fn fetch_reviews(&self, repo: &str, number: u64) -> anyhow::Result<Vec<Review>> {
        let key = format!("reviews:{repo}#{number}");
        if let Some(hit) = self.cached_json::<Vec<Review>>("GET", &key) {
            return Ok(hit);
        }
        let reviews = self.inner.fetch_reviews(repo, number).await?;
        self.store_json("GET", &key, &reviews);
        Ok(reviews)
    }

    async fn fetch_review_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<ReviewComment>> {
        let key = format!("review_comments:{repo}#{number}");
        if let Some(hit) = self.cached_json::<Vec<ReviewComment>>("GET", &key) {
            return Ok(hit);
        }
        let comments = self.inner.fetch_review_comments(repo, number).await?;
        self.store_json("GET", &key, &comments);
        Ok(comments)
    }

    async fn fetch_issue_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<IssueComment>> {
        let key = format!("issue_comments:{repo}#{number}");
        if let Some(hit) = self.cached_json::<Vec<IssueComment>>("GET", &key) {
            return Ok(hit);
        }
        let comments = self.inner.fetch_issue_comments(repo, number).await?;
        self.store_json("GET", &key, &comments);
        Ok(comments)
    }

    async fn fetch_thread_resolution(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<ThreadResolutionMap> {
        // Never cached: a stale resolution map would silently hide
        // "resolved" transitions, which matters more than the extra call.
        self.inner.fetch_thread_resolution(repo, number).await
    }

    async fn fetch_check_runs(&self, repo: &str, head_sha: &str) -> anyhow::Result<Vec<CheckRun>> {
        let key = format!("check_runs:{repo}@{head_sha}");
        if let Some(hit) = self.cached_json::<Vec<CheckRun>>("GET", &key) {
            return Ok(hit);
        }
        let runs = self.inner.fetch_check_runs(repo, head_sha).await?;
        self.store_json("GET", &key, &runs);
        Ok(runs)
    }

    async fn fetch_combined_status(
        &self,
        repo: &str,
        head_sha: &str,
    ) -> anyhow::Result<Option<CiStatus>> {
        let key = format!("combined_status:{repo}@{head_sha}");
        if let Some(hit) = self.cached_json::<Option<CiStatus>>("GET", &key) {
            return Ok(hit);
        }
        let status = self.inner.fetch_combined_status(repo, head_sha).await?;
        self.store_json("GET", &key, &status);
        Ok(status)
    }

    async fn fetch_required_status_checks(
        &self,
        repo: &str,
        branch: &str,
    ) -> anyhow::Result<Option<Vec<String>>> {
        let key = format!("required_checks:{repo}@{branch}");
        if let Some(hit) = self.cached_json::<Option<Vec<String>>>("GET", &key) {
            return Ok(hit);
        }
        let checks = self.inner.fetch_required_status_checks(repo, branch).await?;
        self.store_json("GET", &key, &checks);
        Ok(checks)
    }

    async fn submit_review(
        &self,
        repo: &str,
        number: u64,
        submission: ReviewSubmission,
    ) -> anyhow::Result<()> {
        self.inner.submit_review(repo, number, submission).await?;
        self.invalidate(&format!("#{number}"));
        Ok(())
    }

    async fn reply_to_thread(
        &self,
        repo: &str,
        number: u64,
        in_reply_to: i64,
        body: &str,
    ) -> anyhow::Result<()> {
        self.inner
            .reply_to_thread(repo, number, in_reply_to, body)
            .await?;
        self.invalidate(&format!("#{number}"));
        Ok(())
    }

    async fn create_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> anyhow::Result<()> {
        self.inner.create_issue_comment(repo, number, body).await?;
        self.invalidate(&format!("#{number}"));
        Ok(())
    }

    async fn toggle_draft(&self, repo: &str, number: u64, is_draft: bool) -> anyhow::Result<()> {
        self.inner.toggle_draft(repo, number, is_draft).await?;
        self.invalidate(&format!("pulls:{repo}"));
        self.invalidate(&format!("#{number}"));
        Ok(())
    }

    async fn validate_token(&self, token: &str) -> anyhow::Result<String> {
        // Always bypasses the cache: a token check is never repeated
        // rapidly enough to be worth caching, and caching a credential
        // check result would be actively wrong.
        self.inner.validate_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mygitpanel_core::models::{MergeableStatus, PrStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStub {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamClient for CountingStub {
        async fn fetch_pull_requests(&self, _repo: &str) -> anyhow::Result<Vec<PullRequest>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
        async fn fetch_pr_detail(&self, _repo: &str, _number: u64) -> anyhow::Result<PrDetail> {
            Ok(PrDetail {
                additions: 1,
                deletions: 2,
                changed_files: 3,
                mergeable_status: MergeableStatus::Mergeable,
            })
        }
        async fn fetch_reviews(&self, _repo: &str, _number: u64) -> anyhow::Result<Vec<Review>> {
            Ok(vec![])
        }
        async fn fetch_review_comments(
            &self,
            _repo: &str,
            _number: u64,
        ) -> anyhow::Result<Vec<ReviewComment>> {
            Ok(vec![])
        }
        async fn fetch_issue_comments(
            &self,
            _repo: &str,
            _number: u64,
        ) -> anyhow::Result<Vec<IssueComment>> {
            Ok(vec![])
        }
        async fn fetch_thread_resolution(
            &self,
            _repo: &str,
            _number: u64,
        ) -> anyhow::Result<ThreadResolutionMap> {
            Ok(ThreadResolutionMap::new())
        }
        async fn fetch_check_runs(
            &self,
            _repo: &str,
            _head_sha: &str,
        ) -> anyhow::Result<Vec<CheckRun>> {
            Ok(vec![])
        }
        async fn fetch_combined_status(
            &self,
            _repo: &str,
            _head_sha: &str,
        ) -> anyhow::Result<Option<CiStatus>> {
            Ok(None)
        }
        async fn fetch_required_status_checks(
            &self,
            _repo: &str,
            _branch: &str,
        ) -> anyhow::Result<Option<Vec<String>>> {
            Ok(None)
        }
        async fn submit_review(
            &self,
            _repo: &str,
            _number: u64,
            _submission: ReviewSubmission,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn reply_to_thread(
            &self,
            _repo: &str,
            _number: u64,
            _in_reply_to: i64,
            _body: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn create_issue_comment(
            &self,
            _repo: &str,
            _number: u64,
            _body: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn toggle_draft(
            &self,
            _repo: &str,
            _number: u64,
            _is_draft: bool,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn validate_token(&self, _token: &str) -> anyhow::Result<String> {
            Ok("octocat".to_string())
        }
    }

    #[allow(dead_code)]
    fn unused_status_marker() -> PrStatus {
        PrStatus::Open
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let stub = CountingStub {
            calls: AtomicUsize::new(0),
        };
        let client = CachedGitHubClient::new(stub, CacheMode::ReadWrite);

        client.fetch_pull_requests("o/r").await.unwrap();
        client.fetch_pull_requests("o/r").await.unwrap();

        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn none_mode_never_reads_or_writes_cache() {
        let stub = CountingStub {
            calls: AtomicUsize::new(0),
        };
        let client = CachedGitHubClient::new(stub, CacheMode::None);

        client.fetch_pull_requests("o/r").await.unwrap();
        client.fetch_pull_requests("o/r").await.unwrap();

        assert_eq!(client.inner.calls.load(Ordering::SeqCst), 2);
    }
}
