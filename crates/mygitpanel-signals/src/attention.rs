//! Per-PR attention signals (spec §4.8.1). All four outputs are
//! transient — recomputed on every read, never persisted.

use chrono::{DateTime, Utc};
use mygitpanel_core::models::{CiStatus, PullRequest, Thresholds};
use serde::Serialize;

pub struct AttentionInput<'a> {
    pub pr: &'a PullRequest,
    pub thresholds: Thresholds,
    pub authenticated_username: &'a str,
    pub approval_count: u32,
    /// The authenticated user's most recent review commit SHA on this PR,
    /// empty if they haven't reviewed it.
    pub user_last_review_sha: &'a str,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AttentionSignals {
    pub needs_more_reviews: bool,
    pub is_age_urgent: bool,
    pub has_stale_review: bool,
    pub has_ci_failure: bool,
}

impl AttentionSignals {
    pub fn severity(&self) -> u8 {
        [
            self.needs_more_reviews,
            self.is_age_urgent,
            self.has_stale_review,
            self.has_ci_failure,
        ]
        .iter()
        .filter(|&&b| b)
        .count() as u8
    }

    pub fn has_any(&self) -> bool {
        self.severity() > 0
    }
}

pub fn compute_attention_signals(input: AttentionInput) -> AttentionSignals {
    let AttentionInput {
        pr,
        thresholds,
        authenticated_username,
        approval_count,
        user_last_review_sha,
        now,
    } = input;

    let needs_more_reviews = approval_count < thresholds.review_count_threshold;

    let days_since_opened = (now - pr.opened_at).num_days().max(0) as u32;
    let is_age_urgent =
        thresholds.age_urgency_days > 0 && days_since_opened >= thresholds.age_urgency_days;

    let has_stale_review = thresholds.stale_review_enabled
        && !user_last_review_sha.is_empty()
        && user_last_review_sha != pr.head_sha;

    let has_ci_failure = thresholds.ci_failure_enabled
        && pr.author.eq_ignore_ascii_case(authenticated_username)
        && pr.ci_status == CiStatus::Failing;

    AttentionSignals {
        needs_more_reviews,
        is_age_urgent,
        has_stale_review,
        has_ci_failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mygitpanel_core::models::{MergeableStatus, PrStatus};

    fn sample_pr() -> PullRequest {
        let now = Utc::now();
        PullRequest {
            id: Some(1),
            repo_full_name: "octo/widgets".to_string(),
            number: 42,
            title: "Add widget".to_string(),
            author: "alice".to_string(),
            status: PrStatus::Open,
            is_draft: false,
            url: "https://github.com/octo/widgets/pull/42".to_string(),
            branch: "feature".to_string(),
            base_branch: "main".to_string(),
            labels: vec![],
            head_sha: "deadbeef".to_string(),
            additions: 10,
            deletions: 2,
            changed_files: 3,
            mergeable_status: MergeableStatus::Mergeable,
            ci_status: CiStatus::Failing,
            needs_review: true,
            opened_at: now - chrono::Duration::days(10),
            updated_at: now,
            last_activity_at: now,
            requested_reviewers: vec![],
            requested_team_slugs: vec![],
        }
    }

    #[test]
    fn needs_more_reviews_when_approval_count_below_threshold() {
        let pr = sample_pr();
        let signals = compute_attention_signals(AttentionInput {
            pr: &pr,
            thresholds: Thresholds::default(),
            authenticated_username: "bob",
            approval_count: 0,
            user_last_review_sha: "",
            now: Utc::now(),
        });
        assert!(signals.needs_more_reviews);
    }

    #[test]
    fn age_urgent_respects_zero_disables_flag() {
        let pr = sample_pr();
        let thresholds = Thresholds {
            age_urgency_days: 0,
            ..Thresholds::default()
        };
        let signals = compute_attention_signals(AttentionInput {
            pr: &pr,
            thresholds,
            authenticated_username: "bob",
            approval_count: 5,
            user_last_review_sha: "",
            now: Utc::now(),
        });
        assert!(!signals.is_age_urgent);
    }

    #[test]
    fn stale_review_flagged_only_when_sha_diverges() {
        let pr = sample_pr();
        let signals_same_sha = compute_attention_signals(AttentionInput {
            pr: &pr,
            thresholds: Thresholds::default(),
            authenticated_username: "bob",
            approval_count: 5,
            user_last_review_sha: "deadbeef",
            now: Utc::now(),
        });
        assert!(!signals_same_sha.has_stale_review);

        let signals_diverged = compute_attention_signals(AttentionInput {
            pr: &pr,
            thresholds: Thresholds::default(),
            authenticated_username: "bob",
            approval_count: 5,
            user_last_review_sha: "oldsha",
            now: Utc::now(),
        });
        assert!(signals_diverged.has_stale_review);
    }

    #[test]
    fn ci_failure_only_flagged_for_the_prs_own_author() {
        let pr = sample_pr();
        let signals_as_author = compute_attention_signals(AttentionInput {
            pr: &pr,
            thresholds: Thresholds::default(),
            authenticated_username: "alice",
            approval_count: 5,
            user_last_review_sha: "",
            now: Utc::now(),
        });
        assert!(signals_as_author.has_ci_failure);

        let signals_as_reviewer = compute_attention_signals(AttentionInput {
            pr: &pr,
            thresholds: Thresholds::default(),
            authenticated_username: "bob",
            approval_count: 5,
            user_last_review_sha: "",
            now: Utc::now(),
        });
        assert!(!signals_as_reviewer.has_ci_failure);
    }

    #[test]
    fn severity_counts_true_signals() {
        let signals = AttentionSignals {
            needs_more_reviews: true,
            is_age_urgent: true,
            has_stale_review: false,
            has_ci_failure: true,
        };
        assert_eq!(signals.severity(), 3);
        assert!(signals.has_any());
    }
}
