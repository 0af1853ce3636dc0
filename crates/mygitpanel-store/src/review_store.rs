use async_trait::async_trait;
use mygitpanel_core::models::Review;
use mygitpanel_core::store::ReviewStore;
use mygitpanel_core::CoreResult;
use rusqlite::params;
use tokio_util::sync::CancellationToken;

use crate::conversions::{review_from_row, review_state_param, to_rfc3339};
use crate::SqliteStore;

#[async_trait]
impl ReviewStore for SqliteStore {
    async fn upsert_review(&self, review: &Review, _cancel: &CancellationToken) -> CoreResult<()> {
        let review = review.clone();
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO reviews (id, pr_id, reviewer_login, state, body, commit_id, submitted_at, is_bot)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        reviewer_login = excluded.reviewer_login,
                        state = excluded.state,
                        body = excluded.body,
                        commit_id = excluded.commit_id,
                        submitted_at = excluded.submitted_at,
                        is_bot = excluded.is_bot",
                    params![
                        review.id,
                        review.pr_id,
                        review.reviewer_login,
                        review_state_param(review.state),
                        review.body,
                        review.commit_id,
                        to_rfc3339(review.submitted_at),
                        review.is_bot as i64,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn list_by_pr(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<Vec<Review>> {
        self.pool
            .with_reader(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, pr_id, reviewer_login, state, body, commit_id, submitted_at, is_bot \
                     FROM reviews WHERE pr_id = ?1 ORDER BY submitted_at ASC",
                )?;
                let rows = stmt.query_map([pr_id], review_from_row)?;
                rows.collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mygitpanel_core::models::{
        CiStatus, MergeableStatus, PrStatus, PullRequest, Repository, ReviewState,
    };
    use mygitpanel_core::store::{PullRequestStore, RepoStore};
    use crate::SqliteStore;

    async fn store_with_pr() -> (SqliteStore, i64) {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();
        store
            .add_repo(
                Repository { owner: "octo".to_string(), name: "widgets".to_string(), added_at: Utc::now() },
                &cancel,
            )
            .await
            .unwrap();
        let pr = PullRequest {
            id: None,
            repo_full_name: "octo/widgets".to_string(),
            number: 1,
            title: "Add widgets".to_string(),
            author: "alice".to_string(),
            status: PrStatus::Open,
            is_draft: false,
            url: "https://github.com/octo/widgets/pull/1".to_string(),
            branch: "feature".to_string(),
            base_branch: "main".to_string(),
            labels: vec![],
            head_sha: "deadbeef".to_string(),
            additions: 0,
            deletions: 0,
            changed_files: 0,
            mergeable_status: MergeableStatus::Unknown,
            ci_status: CiStatus::Unknown,
            needs_review: false,
            opened_at: Utc::now(),
            updated_at: Utc::now(),
            last_activity_at: Utc::now(),
            requested_reviewers: vec![],
            requested_team_slugs: vec![],
        };
        let pr_id = store.upsert(&pr, &cancel).await.unwrap();
        (store, pr_id)
    }

    fn review(id: i64, pr_id: i64, state: ReviewState) -> Review {
        Review {
            id,
            pr_id,
            reviewer_login: "bob".to_string(),
            state,
            body: Some("looks good".to_string()),
            commit_id: "deadbeef".to_string(),
            submitted_at: Utc::now(),
            is_bot: false,
        }
    }

    #[tokio::test]
    async fn upsert_review_updates_the_same_row_on_conflict() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        store.upsert_review(&review(1, pr_id, ReviewState::Commented), &cancel).await.unwrap();
        store
            .upsert_review(&review(1, pr_id, ReviewState::Approved), &cancel)
            .await
            .unwrap();

        let reviews = store.list_by_pr(pr_id, &cancel).await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].state, ReviewState::Approved);
    }
}
