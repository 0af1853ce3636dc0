//! Canonical entities tracked by MyGitPanel.
//!
//! These are intentionally separate from any wire format the upstream
//! client or the store use internally — callers always see these shapes,
//! with the never-null-labels and `unknown`-default mergeable/CI status
//! invariants already enforced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked GitHub repository, identified by its `"owner/repo"` full name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

impl Repository {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrStatus {
    Open,
    Closed,
    Merged,
}

/// Mergeability as last observed from the upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeableStatus {
    #[default]
    Unknown,
    Mergeable,
    Conflicting,
    Unstable,
}

/// Combined CI status for a pull request's head commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiStatus {
    #[default]
    Unknown,
    Pending,
    Passing,
    Failing,
}

impl CiStatus {
    /// Strict priority used when combining check-run/commit-status sources (spec §4.7).
    fn priority(self) -> u8 {
        match self {
            CiStatus::Unknown => 0,
            CiStatus::Passing => 1,
            CiStatus::Pending => 2,
            CiStatus::Failing => 3,
        }
    }

    /// Merge two partial classifications, keeping the higher-priority one.
    pub fn combine(self, other: CiStatus) -> CiStatus {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }
}

/// A pull request tracked by MyGitPanel.
///
/// `id` is the surrogate integer primary key used as the foreign-key
/// anchor for reviews/comments/check runs; it only exists once the row
/// has been persisted (see [`PullRequestStore::upsert`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: Option<i64>,
    pub repo_full_name: String,
    pub number: u64,
    pub title: String,
    pub author: String,
    pub status: PrStatus,
    pub is_draft: bool,
    pub url: String,
    pub branch: String,
    pub base_branch: String,
    /// Ordered, never-null label set. A missing/null value normalises to `[]`.
    pub labels: Vec<String>,
    pub head_sha: String,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub mergeable_status: MergeableStatus,
    pub ci_status: CiStatus,
    pub needs_review: bool,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Transient — recomputed on every fetch, never persisted.
    #[serde(default)]
    pub requested_reviewers: Vec<String>,
    /// Transient — recomputed on every fetch, never persisted.
    #[serde(default)]
    pub requested_team_slugs: Vec<String>,
}

impl PullRequest {
    /// `"owner/repo"` + number uniquely identify a PR across polls.
    pub fn key(&self) -> (String, u64) {
        (self.repo_full_name.clone(), self.number)
    }
}

/// A reviewer's review state on a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Pending,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub pr_id: i64,
    pub reviewer_login: String,
    pub state: ReviewState,
    pub body: Option<String>,
    pub commit_id: String,
    pub submitted_at: DateTime<Utc>,
    pub is_bot: bool,
}

/// Which side of a diff a review comment anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Line,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: i64,
    pub review_id: Option<i64>,
    pub pr_id: i64,
    pub author: String,
    pub body: String,
    pub path: String,
    pub line: Option<u32>,
    pub start_line: Option<u32>,
    pub side: Option<DiffSide>,
    pub subject_type: SubjectType,
    pub diff_hunk: Option<String>,
    pub commit_id: String,
    pub is_resolved: bool,
    pub is_outdated: bool,
    /// A thread root has no `in_reply_to_id`. A reply referencing a comment
    /// not (yet) present becomes an orphan thread root (spec §3, §4.8.2).
    pub in_reply_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: i64,
    pub pr_id: i64,
    pub author: String,
    pub body: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    Queued,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Skipped,
}

impl CheckConclusion {
    /// Both `canceled` and `cancelled` spellings are treated as the same
    /// failing conclusion upstream (spec §9 open question).
    pub fn from_upstream_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "neutral" => Some(Self::Neutral),
            "canceled" | "cancelled" => Some(Self::Cancelled),
            "timed_out" => Some(Self::TimedOut),
            "action_required" => Some(Self::ActionRequired),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: i64,
    pub pr_id: i64,
    pub name: String,
    pub status: CheckRunStatus,
    pub conclusion: Option<CheckConclusion>,
    pub is_required: bool,
    pub details_url: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Global defaults, overridable per-repo field-by-field (spec §4.8.1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub review_count_threshold: u32,
    pub age_urgency_days: u32,
    pub stale_review_enabled: bool,
    pub ci_failure_enabled: bool,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            review_count_threshold: 1,
            age_urgency_days: 7,
            stale_review_enabled: true,
            ci_failure_enabled: true,
        }
    }
}

/// Per-repo nullable overrides merged field-by-field over [`Thresholds::default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    pub review_count_threshold: Option<u32>,
    pub age_urgency_days: Option<u32>,
    pub stale_review_enabled: Option<bool>,
    pub ci_failure_enabled: Option<bool>,
}

impl Thresholds {
    pub fn with_overrides(overrides: ThresholdOverrides) -> Thresholds {
        let defaults = Thresholds::default();
        Thresholds {
            review_count_threshold: overrides
                .review_count_threshold
                .unwrap_or(defaults.review_count_threshold),
            age_urgency_days: overrides
                .age_urgency_days
                .unwrap_or(defaults.age_urgency_days),
            stale_review_enabled: overrides
                .stale_review_enabled
                .unwrap_or(defaults.stale_review_enabled),
            ci_failure_enabled: overrides
                .ci_failure_enabled
                .unwrap_or(defaults.ci_failure_enabled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoredPr {
    pub pr_id: i64,
    pub ignored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    pub username: String,
    pub added_at: DateTime<Utc>,
}

/// An opaque credential value whose `Debug` never leaks the secret.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<redacted>")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub service: String,
    pub value: SecretString,
    pub updated_at: DateTime<Utc>,
}
