//! Assembles the enriched review view returned to the API (spec §4.8.2):
//! thread grouping with orphan-root promotion, suggestion extraction,
//! nitpick detection, aggregate review status, and bot flags.

use std::collections::HashMap;

use mygitpanel_core::models::{IssueComment, Review, ReviewComment, ReviewState};
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub comment_id: i64,
    pub path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub proposed_code: String,
    pub original_body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewThread {
    pub root: ReviewComment,
    pub replies: Vec<ReviewComment>,
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateReviewStatus {
    ChangesRequested,
    Pending,
    Approved,
    Commented,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrReviewSummary {
    pub reviews: Vec<Review>,
    pub issue_comments: Vec<IssueComment>,
    pub threads: Vec<ReviewThread>,
    pub suggestions: Vec<Suggestion>,
    pub aggregate_status: AggregateReviewStatus,
    pub has_bot_review: bool,
    pub has_coderabbit_review: bool,
    pub awaiting_coderabbit: bool,
    pub resolved_thread_count: usize,
    pub unresolved_thread_count: usize,
}

fn suggestion_regex() -> Regex {
    Regex::new(r"(?s)```suggestion\r?\n(.*?)\r?\n```").expect("static suggestion regex is valid")
}

const NITPICK_MARKERS: &[&str] = &[
    "**nitpick",
    "[nitpick]",
    "(nitpick)",
    "nitpick:",
    "nitpick (non-blocking)",
];

/// A comment counts as a nitpick only when its author is a bot — the
/// markers above are a convention specific to automated review bots.
pub fn is_nitpick(body: &str, is_bot: bool) -> bool {
    if !is_bot {
        return false;
    }
    let lowered = body.to_lowercase();
    NITPICK_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn is_configured_bot(login: &str, bot_usernames: &[String]) -> bool {
    bot_usernames.iter().any(|b| b.eq_ignore_ascii_case(login))
}

fn extract_suggestions(comment: &ReviewComment) -> Vec<Suggestion> {
    let regex = suggestion_regex();
    regex
        .captures_iter(&comment.body)
        .map(|caps| {
            let proposed_code = caps[1].to_string();
            let start_line = comment.start_line.unwrap_or_else(|| comment.line.unwrap_or(0));
            let end_line = comment.line.unwrap_or(0);
            Suggestion {
                comment_id: comment.id,
                path: comment.path.clone(),
                start_line,
                end_line,
                proposed_code,
                original_body: comment.body.clone(),
            }
        })
        .collect()
}

fn group_threads(
    mut comments: Vec<ReviewComment>,
    resolution: &HashMap<i64, bool>,
) -> Vec<ReviewThread> {
    comments.sort_by_key(|c| c.created_at);

    let present_ids: std::collections::HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let mut roots: Vec<ReviewComment> = Vec::new();
    let mut replies_by_root: HashMap<i64, Vec<ReviewComment>> = HashMap::new();

    for comment in comments {
        match comment.in_reply_to_id {
            None => roots.push(comment),
            Some(parent_id) if present_ids.contains(&parent_id) => {
                replies_by_root.entry(parent_id).or_default().push(comment);
            }
            // Reply to a root we don't have (e.g. it was deleted, or
            // fetched before pagination caught up) — it becomes its own
            // thread root instead of being dropped.
            Some(_) => roots.push(comment),
        }
    }

    roots.sort_by_key(|c| c.created_at);

    roots
        .into_iter()
        .map(|root| {
            let mut replies = replies_by_root.remove(&root.id).unwrap_or_default();
            replies.sort_by_key(|c| c.created_at);
            let is_resolved = resolution.get(&root.id).copied().unwrap_or(root.is_resolved);
            ReviewThread {
                root,
                replies,
                is_resolved,
            }
        })
        .collect()
}

fn aggregate_status(reviews: &[Review], bot_usernames: &[String]) -> AggregateReviewStatus {
    let mut latest_by_reviewer: HashMap<String, &Review> = HashMap::new();
    for review in reviews {
        if is_configured_bot(&review.reviewer_login, bot_usernames) || review.is_bot {
            continue;
        }
        latest_by_reviewer
            .entry(review.reviewer_login.clone())
            .and_modify(|current| {
                if review.submitted_at >= current.submitted_at {
                    *current = review;
                }
            })
            .or_insert(review);
    }

    if latest_by_reviewer.is_empty() {
        return AggregateReviewStatus::Pending;
    }

    if latest_by_reviewer
        .values()
        .any(|r| r.state == ReviewState::ChangesRequested)
    {
        return AggregateReviewStatus::ChangesRequested;
    }

    if latest_by_reviewer
        .values()
        .all(|r| r.state == ReviewState::Approved)
    {
        return AggregateReviewStatus::Approved;
    }

    AggregateReviewStatus::Commented
}

pub fn build_review_summary(
    mut reviews: Vec<Review>,
    review_comments: Vec<ReviewComment>,
    mut issue_comments: Vec<IssueComment>,
    thread_resolution: &HashMap<i64, bool>,
    bot_usernames: &[String],
    head_sha: &str,
) -> PrReviewSummary {
    for review in &mut reviews {
        review.is_bot = review.is_bot || is_configured_bot(&review.reviewer_login, bot_usernames);
    }
    for comment in &mut issue_comments {
        comment.is_bot = comment.is_bot || is_configured_bot(&comment.author, bot_usernames);
    }

    let suggestions = review_comments
        .iter()
        .flat_map(extract_suggestions)
        .collect();

    let threads = group_threads(review_comments, thread_resolution);
    let resolved_thread_count = threads.iter().filter(|t| t.is_resolved).count();
    let unresolved_thread_count = threads.len() - resolved_thread_count;

    let aggregate_status = aggregate_status(&reviews, bot_usernames);

    let has_bot_review = reviews.iter().any(|r| r.is_bot);

    let coderabbit_reviews: Vec<&Review> = reviews
        .iter()
        .filter(|r| r.is_bot && r.reviewer_login.to_lowercase().contains("coderabbit"))
        .collect();
    let has_coderabbit_review = !coderabbit_reviews.is_empty();
    let awaiting_coderabbit = has_coderabbit_review
        && !coderabbit_reviews.iter().any(|r| r.commit_id == head_sha);

    PrReviewSummary {
        reviews,
        issue_comments,
        threads,
        suggestions,
        aggregate_status,
        has_bot_review,
        has_coderabbit_review,
        awaiting_coderabbit,
        resolved_thread_count,
        unresolved_thread_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mygitpanel_core::models::{DiffSide, SubjectType};

    fn comment(id: i64, in_reply_to: Option<i64>, created_offset_secs: i64) -> ReviewComment {
        ReviewComment {
            id,
            review_id: None,
            pr_id: 1,
            author: "alice".to_string(),
            body: "looks good".to_string(),
            path: "src/lib.rs".to_string(),
            line: Some(10),
            start_line: None,
            side: Some(DiffSide::Right),
            subject_type: SubjectType::Line,
            diff_hunk: None,
            commit_id: "sha1".to_string(),
            is_resolved: false,
            is_outdated: false,
            in_reply_to_id: in_reply_to,
            created_at: Utc::now() + chrono::Duration::seconds(created_offset_secs),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn reply_to_absent_root_is_promoted_to_its_own_thread() {
        let comments = vec![comment(2, Some(999), 0)];
        let threads = group_threads(comments, &HashMap::new());
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].root.id, 2);
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn replies_attach_to_present_root_sorted_by_created_at() {
        let comments = vec![
            comment(1, None, 0),
            comment(3, Some(1), 20),
            comment(2, Some(1), 10),
        ];
        let threads = group_threads(comments, &HashMap::new());
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].root.id, 1);
        assert_eq!(threads[0].replies.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn extract_suggestions_pulls_fenced_block_content() {
        let mut c = comment(1, None, 0);
        c.body = "try this:\n```suggestion\nlet x = 1;\n```\nthanks".to_string();
        let suggestions = extract_suggestions(&c);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].proposed_code, "let x = 1;");
    }

    #[test]
    fn nitpick_requires_both_bot_author_and_marker() {
        assert!(is_nitpick("**nitpick**: consider renaming", true));
        assert!(!is_nitpick("**nitpick**: consider renaming", false));
        assert!(!is_nitpick("looks fine", true));
    }

    #[test]
    fn aggregate_status_changes_requested_wins_over_approvals() {
        let reviews = vec![
            Review {
                id: 1,
                pr_id: 1,
                reviewer_login: "alice".to_string(),
                state: ReviewState::Approved,
                body: None,
                commit_id: "sha1".to_string(),
                submitted_at: Utc::now(),
                is_bot: false,
            },
            Review {
                id: 2,
                pr_id: 1,
                reviewer_login: "bob".to_string(),
                state: ReviewState::ChangesRequested,
                body: None,
                commit_id: "sha1".to_string(),
                submitted_at: Utc::now(),
                is_bot: false,
            },
        ];
        assert_eq!(
            aggregate_status(&reviews, &[]),
            AggregateReviewStatus::ChangesRequested
        );
    }

    #[test]
    fn aggregate_status_uses_only_latest_review_per_reviewer() {
        let older = Utc::now() - chrono::Duration::hours(1);
        let reviews = vec![
            Review {
                id: 1,
                pr_id: 1,
                reviewer_login: "alice".to_string(),
                state: ReviewState::ChangesRequested,
                body: None,
                commit_id: "sha1".to_string(),
                submitted_at: older,
                is_bot: false,
            },
            Review {
                id: 2,
                pr_id: 1,
                reviewer_login: "alice".to_string(),
                state: ReviewState::Approved,
                body: None,
                commit_id: "sha2".to_string(),
                submitted_at: Utc::now(),
                is_bot: false,
            },
        ];
        assert_eq!(
            aggregate_status(&reviews, &[]),
            AggregateReviewStatus::Approved
        );
    }

    #[test]
    fn aggregate_status_pending_when_no_non_bot_reviews() {
        assert_eq!(aggregate_status(&[], &[]), AggregateReviewStatus::Pending);
    }
}
