//! Store ports: the minimal set of persistence operations the core
//! requires, expressed as traits so the scheduler/poll-cycle/signals
//! code never depends on a concrete database. `mygitpanel-store`
//! provides the SQLite-backed implementation.
//!
//! Every operation takes a [`CancellationToken`] per spec §5 ("every
//! store operation takes a cancellation token; long reads and writes
//! are expected to respect it").

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::CoreResult;
use crate::models::{
    BotConfig, CheckRun, Credential, IgnoredPr, IssueComment, PullRequest, Repository, Review,
    ReviewComment, SecretString, ThresholdOverrides,
};

#[async_trait]
pub trait RepoStore: Send + Sync {
    async fn list_repos(&self, cancel: &CancellationToken) -> CoreResult<Vec<Repository>>;
    async fn get_repo(
        &self,
        full_name: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<Repository>>;
    /// Errs with [`crate::error::CoreError::Conflict`] if already tracked.
    async fn add_repo(&self, repo: Repository, cancel: &CancellationToken) -> CoreResult<()>;
    /// Cascades to owned PRs (and transitively their reviews/comments/check
    /// runs) per spec §3. Returns `false` if the repo wasn't tracked.
    async fn delete_repo(&self, full_name: &str, cancel: &CancellationToken) -> CoreResult<bool>;
}

#[async_trait]
pub trait PullRequestStore: Send + Sync {
    async fn list_by_repo(
        &self,
        repo_full_name: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<PullRequest>>;

    async fn get_by_number(
        &self,
        repo_full_name: &str,
        number: u64,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<PullRequest>>;

    async fn get_by_id(
        &self,
        id: i64,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<PullRequest>>;

    /// Upsert keyed by `(repo_full_name, number)`. The row's surrogate ID
    /// is stable across upserts and is what callers re-read afterwards to
    /// obtain FK references for enrichment (spec §4.3 step 5).
    async fn upsert(&self, pr: &PullRequest, cancel: &CancellationToken) -> CoreResult<i64>;

    async fn delete(
        &self,
        repo_full_name: &str,
        number: u64,
        cancel: &CancellationToken,
    ) -> CoreResult<bool>;

    /// All tracked PRs excluding ignored ones (`GET /api/v1/prs`).
    async fn list_all_excluding_ignored(
        &self,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<PullRequest>>;

    /// `needs_review` PRs excluding ignored ones (`GET /api/v1/prs/attention`).
    async fn list_attention_excluding_ignored(
        &self,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<PullRequest>>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn upsert_review(&self, review: &Review, cancel: &CancellationToken) -> CoreResult<()>;
    async fn list_by_pr(&self, pr_id: i64, cancel: &CancellationToken)
    -> CoreResult<Vec<Review>>;
}

#[async_trait]
pub trait ReviewCommentStore: Send + Sync {
    async fn upsert_comment(
        &self,
        comment: &ReviewComment,
        cancel: &CancellationToken,
    ) -> CoreResult<()>;
    async fn list_by_pr(
        &self,
        pr_id: i64,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<ReviewComment>>;
    /// Updates just the resolution flag; no other columns are touched
    /// (spec §4.5 step 4: resolution arrives out-of-band from the
    /// thread-resolution query, independent from the comment body fetch).
    async fn set_resolution(
        &self,
        comment_id: i64,
        resolved: bool,
        cancel: &CancellationToken,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait IssueCommentStore: Send + Sync {
    async fn upsert(&self, comment: &IssueComment, cancel: &CancellationToken) -> CoreResult<()>;
    async fn list_by_pr(
        &self,
        pr_id: i64,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<IssueComment>>;
}

#[async_trait]
pub trait CheckRunStore: Send + Sync {
    /// Atomic set replacement: a failed transaction leaves the prior set
    /// intact (spec §3 invariant, §8 testable property 3).
    async fn replace_for_pr(
        &self,
        pr_id: i64,
        runs: Vec<CheckRun>,
        cancel: &CancellationToken,
    ) -> CoreResult<()>;
    async fn list_by_pr(
        &self,
        pr_id: i64,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<CheckRun>>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_overrides(
        &self,
        repo_full_name: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<ThresholdOverrides>;
    async fn set_overrides(
        &self,
        repo_full_name: &str,
        overrides: ThresholdOverrides,
        cancel: &CancellationToken,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait IgnoredPrStore: Send + Sync {
    /// Idempotent: ignoring an already-ignored PR is a no-op.
    async fn ignore(&self, pr_id: i64, cancel: &CancellationToken) -> CoreResult<()>;
    /// Idempotent: unignoring a non-ignored PR is a no-op.
    async fn unignore(&self, pr_id: i64, cancel: &CancellationToken) -> CoreResult<()>;
    async fn is_ignored(&self, pr_id: i64, cancel: &CancellationToken) -> CoreResult<bool>;
    async fn list_ignored(&self, cancel: &CancellationToken) -> CoreResult<Vec<IgnoredPr>>;
}

#[async_trait]
pub trait BotConfigStore: Send + Sync {
    async fn list_bots(&self, cancel: &CancellationToken) -> CoreResult<Vec<BotConfig>>;
    async fn add_bot(&self, username: &str, cancel: &CancellationToken) -> CoreResult<()>;
    async fn remove_bot(&self, username: &str, cancel: &CancellationToken) -> CoreResult<()>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(
        &self,
        service: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<Credential>>;
    async fn set(
        &self,
        service: &str,
        value: SecretString,
        cancel: &CancellationToken,
    ) -> CoreResult<()>;
}

/// The full set of store ports the core depends on, implemented together
/// by a single backing database in `mygitpanel-store`.
pub trait Store:
    RepoStore
    + PullRequestStore
    + ReviewStore
    + ReviewCommentStore
    + IssueCommentStore
    + CheckRunStore
    + SettingsStore
    + IgnoredPrStore
    + BotConfigStore
    + CredentialStore
{
}

impl<T> Store for T where
    T: RepoStore
        + PullRequestStore
        + ReviewStore
        + ReviewCommentStore
        + IssueCommentStore
        + CheckRunStore
        + SettingsStore
        + IgnoredPrStore
        + BotConfigStore
        + CredentialStore
{
}
