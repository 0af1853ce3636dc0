//! Direct `octocrab`-backed implementation of [`UpstreamClient`].
//!
//! Uses octocrab's typed builders where they cover the endpoint, and
//! raw `get`/`post`/`patch`/`put` where they don't (review-comment fetch,
//! combined status, required status checks, review submission, draft
//! toggling — none of these have first-class octocrab support).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use mygitpanel_core::models::{
    CheckConclusion, CheckRun, CheckRunStatus, CiStatus, DiffSide, IssueComment, MergeableStatus,
    PrStatus, PullRequest, Review, ReviewComment, ReviewState, SubjectType,
};
use mygitpanel_core::CoreError;
use octocrab::Octocrab;

use crate::client::UpstreamClient;
use crate::rate_limit::RateLimitTracker;
use crate::types::{PrDetail, ReviewSubmission, ThreadResolutionMap};

/// Retried once a 429/secondary-rate-limit response is seen (spec §4.4);
/// the delay doubles each attempt.
const MAX_RATE_LIMIT_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone)]
pub struct OctocrabClient {
    octocrab: Arc<Octocrab>,
    rate_limiter: Arc<RateLimitTracker>,
}

impl OctocrabClient {
    pub fn new(octocrab: Arc<Octocrab>) -> Self {
        Self {
            octocrab,
            rate_limiter: Arc::new(RateLimitTracker::new()),
        }
    }

    fn split_repo(repo: &str) -> anyhow::Result<(&str, &str)> {
        repo.split_once('/')
            .ok_or_else(|| anyhow::anyhow!("repo must be \"owner/name\", got {repo:?}"))
    }

    /// Retries `attempt` with exponential back-off while it keeps failing
    /// with a rate-limit response, up to [`MAX_RATE_LIMIT_ATTEMPTS`].
    async fn with_rate_limit_retry<T, F, Fut>(&self, mut attempt: F) -> Result<T, octocrab::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, octocrab::Error>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => {
                    self.observe_rate_limit().await;
                    return Ok(value);
                }
                Err(octocrab::Error::GitHub { source, .. })
                    if tries < MAX_RATE_LIMIT_ATTEMPTS && status_code_of(&source) == Some(429) =>
                {
                    let delay = Duration::from_secs(2u64.pow(tries));
                    log::warn!(
                        "GitHub rate limit hit, backing off {delay:?} (attempt {tries}/{MAX_RATE_LIMIT_ATTEMPTS}): {}",
                        source.message
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.observe_rate_limit().await;
                    return Err(err);
                }
            }
        }
    }

    /// Queries current quota via the free `/rate_limit` endpoint (it does
    /// not itself count against the limit) and feeds it to the tracker,
    /// which logs once remaining quota drops below its warning threshold.
    async fn observe_rate_limit(&self) {
        match self.octocrab.ratelimit().get().await {
            Ok(limits) => {
                let core = limits.resources.core;
                self.rate_limiter.observe(core.remaining, core.reset as i64);
            }
            Err(err) => debug!("rate limit check failed: {err}"),
        }
    }
}

#[async_trait]
impl UpstreamClient for OctocrabClient {
    async fn fetch_pull_requests(&self, repo: &str) -> anyhow::Result<Vec<PullRequest>> {
        let (owner, name) = Self::split_repo(repo)?;
        debug!("fetching open PRs for {repo}");

        let mut prs = Vec::new();
        let mut page_num = 1u32;
        const PER_PAGE: u8 = 100;

        loop {
            let page = self
                .with_rate_limit_retry(|| {
                    self.octocrab
                        .pulls(owner, name)
                        .list()
                        .state(octocrab::params::State::Open)
                        .sort(octocrab::params::pulls::Sort::Updated)
                        .direction(octocrab::params::Direction::Descending)
                        .per_page(PER_PAGE)
                        .page(page_num)
                        .send()
                })
                .await?;

            let page_is_empty = page.items.is_empty();
            for pr in &page.items {
                prs.push(convert_pull_request(repo, pr));
            }
            if page_is_empty {
                break;
            }
            page_num += 1;
        }

        debug!("fetched {} open PRs for {repo}", prs.len());
        Ok(prs)
    }

    async fn fetch_pr_detail(&self, repo: &str, number: u64) -> anyhow::Result<PrDetail> {
        let (owner, name) = Self::split_repo(repo)?;
        let pr = self
            .with_rate_limit_retry(|| self.octocrab.pulls(owner, name).get(number))
            .await?;

        let mergeable_status = match (pr.mergeable, pr.mergeable_state.as_ref()) {
            (Some(false), _) => MergeableStatus::Conflicting,
            (_, Some(octocrab::models::pulls::MergeableState::Unstable)) => {
                MergeableStatus::Unstable
            }
            (Some(true), _) => MergeableStatus::Mergeable,
            _ => MergeableStatus::Unknown,
        };

        Ok(PrDetail {
            additions: pr.additions.unwrap_or(0),
            deletions: pr.deletions.unwrap_or(0),
            changed_files: pr.changed_files.unwrap_or(0),
            mergeable_status,
        })
    }

    async fn fetch_reviews(&self, repo: &str, number: u64) -> anyhow::Result<Vec<Review>> {
        let (owner, name) = Self::split_repo(repo)?;
        let reviews = self
            .with_rate_limit_retry(|| self.octocrab.pulls(owner, name).list_reviews(number).send())
            .await
            .map_err(format_octocrab_error)?;

        let reviews = reviews
            .items
            .into_iter()
            .map(|r| {
                let reviewer_login = r
                    .user
                    .as_ref()
                    .map(|u| u.login.clone())
                    .unwrap_or_else(|| "unknown".to_string());
                Review {
                    id: r.id.0 as i64,
                    pr_id: 0,
                    is_bot: reviewer_login.ends_with("[bot]"),
                    reviewer_login,
                    state: convert_review_state(r.state),
                    body: if r.body.is_empty() { None } else { Some(r.body) },
                    commit_id: r.commit_id.unwrap_or_default(),
                    submitted_at: r.submitted_at.unwrap_or_else(chrono::Utc::now),
                }
            })
            .collect();

        Ok(reviews)
    }

    async fn fetch_review_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<ReviewComment>> {
        let (owner, name) = Self::split_repo(repo)?;

        // octocrab has no typed review-comment listing; the payload shape
        // (in_reply_to_id, side, line vs original_line) is easier to read
        // straight off the JSON.
        let route = format!("/repos/{owner}/{name}/pulls/{number}/comments?per_page=100");
        let raw: Vec<serde_json::Value> = self
            .with_rate_limit_retry(|| self.octocrab.get(route.clone(), None::<&()>))
            .await
            .map_err(format_octocrab_error)?;

        let comments = raw
            .into_iter()
            .filter_map(|c| {
                let id = c["id"].as_i64()?;
                let path = c["path"].as_str()?.to_string();
                let body = c["body"].as_str()?.to_string();
                let author = c["user"]["login"].as_str().unwrap_or("unknown").to_string();
                let created_at = parse_rfc3339(c["created_at"].as_str()?)?;
                let updated_at = parse_rfc3339(c["updated_at"].as_str()?)?;
                let commit_id = c["commit_id"].as_str().unwrap_or_default().to_string();
                let line = c["line"].as_u64().map(|l| l as u32);
                let start_line = c["start_line"].as_u64().map(|l| l as u32);
                let side = c["side"].as_str().and_then(|s| match s {
                    "LEFT" => Some(DiffSide::Left),
                    "RIGHT" => Some(DiffSide::Right),
                    _ => None,
                });
                let in_reply_to_id = c["in_reply_to_id"].as_i64();
                // GitHub marks an outdated comment by clearing `position`
                // while keeping `original_position`.
                let is_outdated = c["position"].is_null() && !c["original_position"].is_null();
                let subject_type = if line.is_some() {
                    SubjectType::Line
                } else {
                    SubjectType::File
                };

                Some(ReviewComment {
                    id,
                    review_id: c["pull_request_review_id"].as_i64(),
                    pr_id: 0,
                    author,
                    body,
                    path,
                    line,
                    start_line,
                    side,
                    subject_type,
                    diff_hunk: c["diff_hunk"].as_str().map(str::to_string),
                    commit_id,
                    // filled in by the caller from fetch_thread_resolution
                    is_resolved: false,
                    is_outdated,
                    in_reply_to_id,
                    created_at,
                    updated_at,
                })
            })
            .collect();

        Ok(comments)
    }

    async fn fetch_issue_comments(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<Vec<IssueComment>> {
        let (owner, name) = Self::split_repo(repo)?;
        let comments = self
            .with_rate_limit_retry(|| {
                self.octocrab
                    .issues(owner, name)
                    .list_comments(number)
                    .per_page(100)
                    .send()
            })
            .await
            .map_err(format_octocrab_error)?;

        let comments = comments
            .items
            .into_iter()
            .map(|c| {
                let author = c
                    .user
                    .login
                    .clone();
                IssueComment {
                    id: c.id.0 as i64,
                    pr_id: 0,
                    is_bot: author.ends_with("[bot]"),
                    author,
                    body: c.body.unwrap_or_default(),
                    created_at: c.created_at,
                    updated_at: c.updated_at.unwrap_or(c.created_at),
                }
            })
            .collect();

        Ok(comments)
    }

    async fn fetch_thread_resolution(
        &self,
        repo: &str,
        number: u64,
    ) -> anyhow::Result<ThreadResolutionMap> {
        let (owner, name) = Self::split_repo(repo)?;

        // Thread resolution is GraphQL-only on the GitHub API; REST never
        // exposes `isResolved`. A failure here degrades to "nothing
        // resolved" rather than failing the whole poll cycle.
        let query = serde_json::json!({
            "query": r#"
                query($owner: String!, $name: String!, $number: Int!, $cursor: String) {
                  repository(owner: $owner, name: $name) {
                    pullRequest(number: $number) {
                      reviewThreads(first: 100, after: $cursor) {
                        pageInfo { hasNextPage endCursor }
                        nodes {
                          isResolved
                          comments(first: 1) { nodes { databaseId } }
                        }
                      }
                    }
                  }
                }
            "#,
            "variables": {
                "owner": owner,
                "name": name,
                "number": number,
                "cursor": serde_json::Value::Null,
            }
        });

        let response: Result<serde_json::Value, _> = self.octocrab.graphql(&query).await;
        let response = match response {
            Ok(r) => r,
            Err(err) => {
                debug!("thread resolution query failed for {repo}#{number}: {err}");
                return Ok(ThreadResolutionMap::new());
            }
        };

        let mut map = ThreadResolutionMap::new();
        let nodes = response["data"]["repository"]["pullRequest"]["reviewThreads"]["nodes"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        for node in nodes {
            let is_resolved = node["isResolved"].as_bool().unwrap_or(false);
            if let Some(root_id) = node["comments"]["nodes"][0]["databaseId"].as_i64() {
                map.insert(root_id, is_resolved);
            }
        }

        Ok(map)
    }

    async fn fetch_check_runs(&self, repo: &str, head_sha: &str) -> anyhow::Result<Vec<CheckRun>> {
        let (owner, name) = Self::split_repo(repo)?;
        let checks = self
            .with_rate_limit_retry(|| {
                self.octocrab
                    .checks(owner, name)
                    .list_check_runs_for_git_ref(head_sha.to_string().into())
                    .send()
            })
            .await
            .map_err(format_octocrab_error)?;

        let runs = checks
            .check_runs
            .into_iter()
            .map(|run| {
                let status = if run.completed_at.is_some() {
                    CheckRunStatus::Completed
                } else if run.started_at.is_some() {
                    CheckRunStatus::InProgress
                } else {
                    CheckRunStatus::Queued
                };
                CheckRun {
                    id: run.id.0 as i64,
                    pr_id: 0,
                    name: run.name,
                    status,
                    conclusion: run
                        .conclusion
                        .as_deref()
                        .and_then(CheckConclusion::from_upstream_str),
                    // required-ness comes from the branch-protection check,
                    // stitched in by the caller.
                    is_required: false,
                    details_url: run.details_url,
                    started_at: run.started_at,
                    completed_at: run.completed_at,
                }
            })
            .collect();

        Ok(runs)
    }

    async fn fetch_combined_status(
        &self,
        repo: &str,
        head_sha: &str,
    ) -> anyhow::Result<Option<CiStatus>> {
        let (owner, name) = Self::split_repo(repo)?;
        let route = format!("/repos/{owner}/{name}/commits/{head_sha}/status");
        let status: octocrab::models::CombinedStatus = match self
            .with_rate_limit_retry(|| self.octocrab.get(route.clone(), None::<&()>))
            .await
        {
            Ok(s) => s,
            Err(err) => {
                debug!("combined status fetch failed for {repo}@{head_sha}: {err}");
                return Ok(None);
            }
        };

        if status.total_count == 0 {
            return Ok(None);
        }

        let mapped = match status.state {
            octocrab::models::StatusState::Success => CiStatus::Passing,
            octocrab::models::StatusState::Pending => CiStatus::Pending,
            octocrab::models::StatusState::Failure | octocrab::models::StatusState::Error => {
                CiStatus::Failing
            }
            _ => CiStatus::Unknown,
        };
        Ok(Some(mapped))
    }

    async fn fetch_required_status_checks(
        &self,
        repo: &str,
        branch: &str,
    ) -> anyhow::Result<Option<Vec<String>>> {
        let (owner, name) = Self::split_repo(repo)?;
        let route = format!("/repos/{owner}/{name}/branches/{branch}/protection/required_status_checks");

        #[derive(serde::Deserialize)]
        struct RequiredStatusChecks {
            contexts: Vec<String>,
        }

        match self
            .with_rate_limit_retry(|| self.octocrab.get::<RequiredStatusChecks, _, ()>(route.clone(), None::<&()>))
            .await
        {
            Ok(checks) => Ok(Some(checks.contexts)),
            Err(octocrab::Error::GitHub { source, .. })
                if matches!(status_code_of(&source), Some(403) | Some(404)) =>
            {
                Ok(None)
            }
            Err(err) => {
                debug!("required status checks unavailable for {repo}@{branch}: {err}");
                Ok(None)
            }
        }
    }

    async fn submit_review(
        &self,
        repo: &str,
        number: u64,
        submission: ReviewSubmission,
    ) -> anyhow::Result<()> {
        let (owner, name) = Self::split_repo(repo)?;

        let commit_id = match submission.commit_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                self.with_rate_limit_retry(|| self.octocrab.pulls(owner, name).get(number))
                    .await?
                    .head
                    .sha
            }
        };

        let comments: Vec<_> = submission
            .comments
            .iter()
            .map(|c| {
                serde_json::json!({
                    "path": c.path,
                    "line": c.line,
                    "side": match c.side {
                        DiffSide::Left => "LEFT",
                        DiffSide::Right => "RIGHT",
                    },
                    "body": c.body,
                })
            })
            .collect();

        let mut payload = serde_json::json!({
            "commit_id": commit_id,
            "comments": comments,
        });
        if let Some(event) = submission.event {
            payload["event"] = serde_json::Value::String(
                match event {
                    crate::types::ReviewEvent::Approve => "APPROVE",
                    crate::types::ReviewEvent::RequestChanges => "REQUEST_CHANGES",
                    crate::types::ReviewEvent::Comment => "COMMENT",
                }
                .to_string(),
            );
        }
        if let Some(body) = submission.body {
            payload["body"] = serde_json::Value::String(body);
        }

        let route = format!("/repos/{owner}/{name}/pulls/{number}/reviews");
        let _response: serde_json::Value = self
            .with_rate_limit_retry(|| self.octocrab.post(route.clone(), Some(&payload)))
            .await
            .map_err(|err| match &err {
                octocrab::Error::GitHub { source, .. } if status_code_of(source) == Some(422) => {
                    anyhow::anyhow!(CoreError::UpstreamConflict)
                }
                _ => format_octocrab_error(err),
            })?;

        Ok(())
    }

    async fn reply_to_thread(
        &self,
        repo: &str,
        number: u64,
        in_reply_to: i64,
        body: &str,
    ) -> anyhow::Result<()> {
        let (owner, name) = Self::split_repo(repo)?;
        let route = format!("/repos/{owner}/{name}/pulls/{number}/comments");
        let payload = serde_json::json!({
            "body": body,
            "in_reply_to": in_reply_to,
        });
        let _response: serde_json::Value = self
            .with_rate_limit_retry(|| self.octocrab.post(route.clone(), Some(&payload)))
            .await
            .map_err(format_octocrab_error)?;
        Ok(())
    }

    async fn create_issue_comment(
        &self,
        repo: &str,
        number: u64,
        body: &str,
    ) -> anyhow::Result<()> {
        let (owner, name) = Self::split_repo(repo)?;
        self.with_rate_limit_retry(|| self.octocrab.issues(owner, name).create_comment(number, body))
            .await
            .map_err(format_octocrab_error)?;
        Ok(())
    }

    async fn toggle_draft(&self, repo: &str, number: u64, is_draft: bool) -> anyhow::Result<()> {
        let (owner, name) = Self::split_repo(repo)?;
        // octocrab has no ready_for_review/convert_to_draft builder; both
        // are GraphQL mutations in the upstream API.
        let mutation_name = if is_draft {
            "convertPullRequestToDraft"
        } else {
            "markPullRequestReadyForReview"
        };
        let pr = self
            .with_rate_limit_retry(|| self.octocrab.pulls(owner, name).get(number))
            .await?;
        let node_id = pr.node_id.unwrap_or_default();

        let query = serde_json::json!({
            "query": format!(
                "mutation($id: ID!) {{ {mutation_name}(input: {{ pullRequestId: $id }}) {{ clientMutationId }} }}"
            ),
            "variables": { "id": node_id },
        });
        let _response: serde_json::Value = self
            .with_rate_limit_retry(|| self.octocrab.graphql(&query))
            .await
            .map_err(|err| anyhow::anyhow!("{err}"))?;
        Ok(())
    }

    async fn validate_token(&self, token: &str) -> anyhow::Result<String> {
        let client = Octocrab::builder().personal_token(token.to_string()).build()?;
        let user = client.current().user().await?;
        Ok(user.login)
    }
}

fn status_code_of(source: &octocrab::models::GitHubError) -> Option<u16> {
    // octocrab's GitHubError doesn't carry the HTTP status directly; the
    // message text is the only signal we get without a second round trip.
    let msg = &source.message;
    if msg.contains("Not Found") {
        Some(404)
    } else if msg.contains("Forbidden") {
        Some(403)
    } else if msg.contains("rate limit") || msg.contains("Rate limit") || msg.contains("Rate Limit") {
        Some(429)
    } else if msg.contains("Validation Failed")
        || msg.contains("Unprocessable")
        || msg.contains("pull request has already been merged")
    {
        Some(422)
    } else {
        None
    }
}

fn parse_rfc3339(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

fn convert_review_state(state: Option<octocrab::models::pulls::ReviewState>) -> ReviewState {
    use octocrab::models::pulls::ReviewState as ORS;
    match state {
        Some(ORS::Approved) => ReviewState::Approved,
        Some(ORS::ChangesRequested) => ReviewState::ChangesRequested,
        Some(ORS::Commented) => ReviewState::Commented,
        Some(ORS::Dismissed) => ReviewState::Dismissed,
        Some(ORS::Pending) | None => ReviewState::Pending,
        _ => ReviewState::Pending,
    }
}

fn convert_pull_request(repo: &str, pr: &octocrab::models::pulls::PullRequest) -> PullRequest {
    let author = pr
        .user
        .as_ref()
        .map(|u| u.login.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let labels = pr
        .labels
        .as_ref()
        .map(|ls| ls.iter().map(|l| l.name.clone()).collect())
        .unwrap_or_default();
    let opened_at = pr.created_at.unwrap_or_else(chrono::Utc::now);
    let updated_at = pr.updated_at.unwrap_or(opened_at);

    PullRequest {
        id: None,
        repo_full_name: repo.to_string(),
        number: pr.number,
        title: pr.title.clone().unwrap_or_default(),
        author,
        status: if pr.merged_at.is_some() {
            PrStatus::Merged
        } else {
            PrStatus::Open
        },
        is_draft: pr.draft.unwrap_or(false),
        url: pr
            .html_url
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_default(),
        branch: pr.head.ref_field.clone(),
        base_branch: pr.base.ref_field.clone(),
        labels,
        head_sha: pr.head.sha.clone(),
        additions: pr.additions.unwrap_or(0),
        deletions: pr.deletions.unwrap_or(0),
        changed_files: pr.changed_files.unwrap_or(0),
        mergeable_status: MergeableStatus::Unknown,
        ci_status: CiStatus::Unknown,
        needs_review: false,
        opened_at,
        updated_at,
        last_activity_at: updated_at,
        requested_reviewers: pr
            .requested_reviewers
            .as_ref()
            .map(|rs| rs.iter().map(|u| u.login.clone()).collect())
            .unwrap_or_default(),
        requested_team_slugs: pr
            .requested_teams
            .as_ref()
            .map(|ts| ts.iter().map(|t| t.slug.clone()).collect())
            .unwrap_or_default(),
    }
}

/// Extracts a usable message from an octocrab error; its default `Display`
/// only prints the variant name.
fn format_octocrab_error(err: octocrab::Error) -> anyhow::Error {
    match &err {
        octocrab::Error::GitHub { source, .. } => {
            let msg = &source.message;
            let details = source
                .errors
                .as_ref()
                .map(|errs| {
                    errs.iter()
                        .filter_map(|e| e.as_str().or_else(|| e.get("message")?.as_str()))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .filter(|s| !s.is_empty());
            match details {
                Some(d) => anyhow::anyhow!("{msg}: {d}"),
                None => anyhow::anyhow!("{msg}"),
            }
        }
        _ => anyhow::anyhow!("{err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_repo_rejects_missing_separator() {
        assert!(OctocrabClient::split_repo("not-a-repo").is_err());
    }

    #[test]
    fn split_repo_splits_on_first_slash() {
        let (owner, name) = OctocrabClient::split_repo("owner/name").unwrap();
        assert_eq!(owner, "owner");
        assert_eq!(name, "name");
    }
}
