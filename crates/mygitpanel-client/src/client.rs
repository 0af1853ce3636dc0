//! The upstream client port (spec §4.4) and the cache-mode enum used by
//! the caching decorator.

use async_trait::async_trait;
use mygitpanel_core::models::{CheckRun, IssueComment, PullRequest, Review, ReviewComment};

use crate::types::{PrDetail, ReviewSubmission, ThreadResolutionMap};

/// Cache behavior mode, set at client construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// No caching — neither read nor write. Used for manual-refresh requests
    /// that must see the true current upstream state.
    None,
    /// Skip cache reads, still write responses — "force refresh".
    WriteOnly,
    /// Read from cache, don't update it.
    #[allow(dead_code)]
    ReadOnly,
    /// Full caching — the default for scheduled polls.
    #[default]
    ReadWrite,
}

impl CacheMode {
    pub fn should_read(&self) -> bool {
        matches!(self, CacheMode::ReadOnly | CacheMode::ReadWrite)
    }

    pub fn should_write(&self) -> bool {
        matches!(self, CacheMode::WriteOnly | CacheMode::ReadWrite)
    }
}

/// The read/write operations the core requires from the upstream forge.
///
/// Implementations must be `Send + Sync` to be shared between the
/// scheduler and HTTP handlers via the [`mygitpanel_provider`]-managed
/// cell. Returned entities carry `pr_id = 0` as a placeholder where the
/// surrogate foreign key isn't yet known — callers stamp the real value
/// before persisting (spec §4.5).
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Open PRs for a repository, paginated 100/page, ordered by `updated`
    /// descending, following upstream pagination until exhausted (spec §4.3
    /// step 2). `repo` is `"owner/repo"`.
    async fn fetch_pull_requests(&self, repo: &str) -> anyhow::Result<Vec<PullRequest>>;

    /// Full PR detail — additions/deletions/changed_files/mergeable status —
    /// not available on the open-list endpoint (spec §4.6 step 1).
    async fn fetch_pr_detail(&self, repo: &str, number: u64) -> anyhow::Result<PrDetail>;

    async fn fetch_reviews(&self, repo: &str, number: u64) -> anyhow::Result<Vec<Review>>;

    async fn fetch_review_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<ReviewComment>>;

    async fn fetch_issue_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<IssueComment>>;

    /// Root comment ID → resolved? Failure degrades to an empty map inside
    /// the implementation; this never returns `Err` (spec §4.4).
    async fn fetch_thread_resolution(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<ThreadResolutionMap>;

    /// Check runs keyed by commit SHA (`pr_id` placeholder unset).
    async fn fetch_check_runs(&self, repo: &str, head_sha: &str) -> anyhow::Result<Vec<CheckRun>>;

    /// Combined commit status classified into the core `CiStatus`
    /// categories; `None` if neither state is determinable (spec §4.7).
    async fn fetch_combined_status(
        &self,
        repo: &str,
        head_sha: &str,
    ) -> anyhow::Result<Option<mygitpanel_core::models::CiStatus>>;

    /// Required status-check contexts for a base branch. 403/404 degrades
    /// to `Ok(None)` ("no required contexts"), never an error (spec §4.4).
    async fn fetch_required_status_checks(
        &self,
        repo: &str,
        branch: &str,
    ) -> anyhow::Result<Option<Vec<String>>>;

    // --- write side (spec §4.9) ---

    /// A 422 from the upstream should surface as
    /// [`mygitpanel_core::CoreError::UpstreamConflict`] to the caller.
    async fn submit_review(
        &self,
        repo: &str,
        number: u64,
        submission: ReviewSubmission,
    ) -> anyhow::Result<()>;

    async fn reply_to_thread(
        &self,
        repo: &str,
        number: u64,
        in_reply_to: i64,
        body: &str,
    ) -> anyhow::Result<()>;

    async fn create_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> anyhow::Result<()>;

    async fn toggle_draft(&self, repo: &str, number: u64, is_draft: bool) -> anyhow::Result<()>;

    /// One-shot call with a fresh transport; does not mutate any held
    /// client state. Returns the authenticated login.
    async fn validate_token(&self, token: &str) -> anyhow::Result<String>;
}
