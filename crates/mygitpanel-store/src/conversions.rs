//! Row <-> entity conversions. Timestamps are stored as RFC3339 text,
//! enums as their lowercase serde tag, and the PR label list as a JSON
//! array column — keeping a bare in-memory `PullRequest` constructed in
//! tests valid without touching this boundary.

use chrono::{DateTime, Utc};
use mygitpanel_core::models::{
    CheckConclusion, CheckRun, CheckRunStatus, CiStatus, DiffSide, IssueComment, MergeableStatus,
    PrStatus, PullRequest, Review, ReviewComment, ReviewState, SubjectType,
};
use rusqlite::{Error as SqlError, Row};

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn parse_rfc3339(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::InvalidColumnType(0, format!("bad timestamp {s:?}: {e}"), rusqlite::types::Type::Text))
}

fn pr_status_to_str(status: PrStatus) -> &'static str {
    match status {
        PrStatus::Open => "open",
        PrStatus::Closed => "closed",
        PrStatus::Merged => "merged",
    }
}

fn pr_status_from_str(s: &str) -> PrStatus {
    match s {
        "closed" => PrStatus::Closed,
        "merged" => PrStatus::Merged,
        _ => PrStatus::Open,
    }
}

fn mergeable_to_str(status: MergeableStatus) -> &'static str {
    match status {
        MergeableStatus::Unknown => "unknown",
        MergeableStatus::Mergeable => "mergeable",
        MergeableStatus::Conflicting => "conflicting",
        MergeableStatus::Unstable => "unstable",
    }
}

fn mergeable_from_str(s: &str) -> MergeableStatus {
    match s {
        "mergeable" => MergeableStatus::Mergeable,
        "conflicting" => MergeableStatus::Conflicting,
        "unstable" => MergeableStatus::Unstable,
        _ => MergeableStatus::Unknown,
    }
}

fn ci_status_to_str(status: CiStatus) -> &'static str {
    match status {
        CiStatus::Unknown => "unknown",
        CiStatus::Pending => "pending",
        CiStatus::Passing => "passing",
        CiStatus::Failing => "failing",
    }
}

fn ci_status_from_str(s: &str) -> CiStatus {
    match s {
        "pending" => CiStatus::Pending,
        "passing" => CiStatus::Passing,
        "failing" => CiStatus::Failing,
        _ => CiStatus::Unknown,
    }
}

pub fn pull_request_from_row(row: &Row) -> rusqlite::Result<PullRequest> {
    let labels_json: String = row.get("labels")?;
    let labels: Vec<String> = serde_json::from_str(&labels_json).unwrap_or_default();
    let status: String = row.get("status")?;
    let mergeable_status: String = row.get("mergeable_status")?;
    let ci_status: String = row.get("ci_status")?;

    Ok(PullRequest {
        id: Some(row.get("id")?),
        repo_full_name: row.get("repo_full_name")?,
        number: row.get::<_, i64>("number")? as u64,
        title: row.get("title")?,
        author: row.get("author")?,
        status: pr_status_from_str(&status),
        is_draft: row.get::<_, i64>("is_draft")? != 0,
        url: row.get("url")?,
        branch: row.get("branch")?,
        base_branch: row.get("base_branch")?,
        labels,
        head_sha: row.get("head_sha")?,
        additions: row.get::<_, i64>("additions")? as u64,
        deletions: row.get::<_, i64>("deletions")? as u64,
        changed_files: row.get::<_, i64>("changed_files")? as u64,
        mergeable_status: mergeable_from_str(&mergeable_status),
        ci_status: ci_status_from_str(&ci_status),
        needs_review: row.get::<_, i64>("needs_review")? != 0,
        opened_at: parse_rfc3339(&row.get::<_, String>("opened_at")?)?,
        updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?)?,
        last_activity_at: parse_rfc3339(&row.get::<_, String>("last_activity_at")?)?,
        requested_reviewers: Vec::new(),
        requested_team_slugs: Vec::new(),
    })
}

pub struct PrParams {
    pub status: &'static str,
    pub is_draft: i64,
    pub labels_json: String,
    pub mergeable_status: &'static str,
    pub ci_status: &'static str,
    pub needs_review: i64,
    pub opened_at: String,
    pub updated_at: String,
    pub last_activity_at: String,
}

pub fn pr_params(pr: &PullRequest) -> PrParams {
    PrParams {
        status: pr_status_to_str(pr.status),
        is_draft: pr.is_draft as i64,
        labels_json: serde_json::to_string(&pr.labels).unwrap_or_else(|_| "[]".to_string()),
        mergeable_status: mergeable_to_str(pr.mergeable_status),
        ci_status: ci_status_to_str(pr.ci_status),
        needs_review: pr.needs_review as i64,
        opened_at: to_rfc3339(pr.opened_at),
        updated_at: to_rfc3339(pr.updated_at),
        last_activity_at: to_rfc3339(pr.last_activity_at),
    }
}

fn review_state_to_str(state: ReviewState) -> &'static str {
    match state {
        ReviewState::Approved => "approved",
        ReviewState::ChangesRequested => "changes_requested",
        ReviewState::Commented => "commented",
        ReviewState::Pending => "pending",
        ReviewState::Dismissed => "dismissed",
    }
}

fn review_state_from_str(s: &str) -> ReviewState {
    match s {
        "approved" => ReviewState::Approved,
        "changes_requested" => ReviewState::ChangesRequested,
        "commented" => ReviewState::Commented,
        "dismissed" => ReviewState::Dismissed,
        _ => ReviewState::Pending,
    }
}

pub fn review_from_row(row: &Row) -> rusqlite::Result<Review> {
    let state: String = row.get("state")?;
    Ok(Review {
        id: row.get("id")?,
        pr_id: row.get("pr_id")?,
        reviewer_login: row.get("reviewer_login")?,
        state: review_state_from_str(&state),
        body: row.get("body")?,
        commit_id: row.get("commit_id")?,
        submitted_at: parse_rfc3339(&row.get::<_, String>("submitted_at")?)?,
        is_bot: row.get::<_, i64>("is_bot")? != 0,
    })
}

pub fn review_state_param(state: ReviewState) -> &'static str {
    review_state_to_str(state)
}

fn diff_side_to_str(side: DiffSide) -> &'static str {
    match side {
        DiffSide::Left => "LEFT",
        DiffSide::Right => "RIGHT",
    }
}

fn diff_side_from_str(s: &str) -> Option<DiffSide> {
    match s {
        "LEFT" => Some(DiffSide::Left),
        "RIGHT" => Some(DiffSide::Right),
        _ => None,
    }
}

fn subject_type_to_str(subject: SubjectType) -> &'static str {
    match subject {
        SubjectType::Line => "line",
        SubjectType::File => "file",
    }
}

fn subject_type_from_str(s: &str) -> SubjectType {
    match s {
        "file" => SubjectType::File,
        _ => SubjectType::Line,
    }
}

pub fn review_comment_from_row(row: &Row) -> rusqlite::Result<ReviewComment> {
    let subject_type: String = row.get("subject_type")?;
    let side: Option<String> = row.get("side")?;
    Ok(ReviewComment {
        id: row.get("id")?,
        review_id: row.get("review_id")?,
        pr_id: row.get("pr_id")?,
        author: row.get("author")?,
        body: row.get("body")?,
        path: row.get("path")?,
        line: row.get::<_, Option<i64>>("line")?.map(|v| v as u32),
        start_line: row.get::<_, Option<i64>>("start_line")?.map(|v| v as u32),
        side: side.as_deref().and_then(diff_side_from_str),
        subject_type: subject_type_from_str(&subject_type),
        diff_hunk: row.get("diff_hunk")?,
        commit_id: row.get("commit_id")?,
        is_resolved: row.get::<_, i64>("is_resolved")? != 0,
        is_outdated: row.get::<_, i64>("is_outdated")? != 0,
        in_reply_to_id: row.get("in_reply_to_id")?,
        created_at: parse_rfc3339(&row.get::<_, String>("created_at")?)?,
        updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?)?,
    })
}

pub struct ReviewCommentParams {
    pub side: Option<&'static str>,
    pub subject_type: &'static str,
    pub is_resolved: i64,
    pub is_outdated: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub fn review_comment_params(comment: &ReviewComment) -> ReviewCommentParams {
    ReviewCommentParams {
        side: comment.side.map(diff_side_to_str),
        subject_type: subject_type_to_str(comment.subject_type),
        is_resolved: comment.is_resolved as i64,
        is_outdated: comment.is_outdated as i64,
        created_at: to_rfc3339(comment.created_at),
        updated_at: to_rfc3339(comment.updated_at),
    }
}

pub fn issue_comment_from_row(row: &Row) -> rusqlite::Result<IssueComment> {
    Ok(IssueComment {
        id: row.get("id")?,
        pr_id: row.get("pr_id")?,
        author: row.get("author")?,
        body: row.get("body")?,
        is_bot: row.get::<_, i64>("is_bot")? != 0,
        created_at: parse_rfc3339(&row.get::<_, String>("created_at")?)?,
        updated_at: parse_rfc3339(&row.get::<_, String>("updated_at")?)?,
    })
}

fn check_run_status_to_str(status: CheckRunStatus) -> &'static str {
    match status {
        CheckRunStatus::Queued => "queued",
        CheckRunStatus::InProgress => "in_progress",
        CheckRunStatus::Completed => "completed",
    }
}

fn check_run_status_from_str(s: &str) -> CheckRunStatus {
    match s {
        "in_progress" => CheckRunStatus::InProgress,
        "completed" => CheckRunStatus::Completed,
        _ => CheckRunStatus::Queued,
    }
}

fn check_conclusion_to_str(conclusion: CheckConclusion) -> &'static str {
    match conclusion {
        CheckConclusion::Success => "success",
        CheckConclusion::Failure => "failure",
        CheckConclusion::Neutral => "neutral",
        CheckConclusion::Cancelled => "cancelled",
        CheckConclusion::TimedOut => "timed_out",
        CheckConclusion::ActionRequired => "action_required",
        CheckConclusion::Skipped => "skipped",
    }
}

pub fn check_run_from_row(row: &Row) -> rusqlite::Result<CheckRun> {
    let status: String = row.get("status")?;
    let conclusion: Option<String> = row.get("conclusion")?;
    Ok(CheckRun {
        id: row.get("id")?,
        pr_id: row.get("pr_id")?,
        name: row.get("name")?,
        status: check_run_status_from_str(&status),
        conclusion: conclusion.as_deref().and_then(CheckConclusion::from_upstream_str),
        is_required: row.get::<_, i64>("is_required")? != 0,
        details_url: row.get("details_url")?,
        started_at: row
            .get::<_, Option<String>>("started_at")?
            .map(|s| parse_rfc3339(&s))
            .transpose()?,
        completed_at: row
            .get::<_, Option<String>>("completed_at")?
            .map(|s| parse_rfc3339(&s))
            .transpose()?,
    })
}

pub struct CheckRunParams {
    pub status: &'static str,
    pub conclusion: Option<&'static str>,
    pub is_required: i64,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
}

pub fn check_run_params(run: &CheckRun) -> CheckRunParams {
    CheckRunParams {
        status: check_run_status_to_str(run.status),
        conclusion: run.conclusion.map(check_conclusion_to_str),
        is_required: run.is_required as i64,
        started_at: run.started_at.map(to_rfc3339),
        completed_at: run.completed_at.map(to_rfc3339),
    }
}
