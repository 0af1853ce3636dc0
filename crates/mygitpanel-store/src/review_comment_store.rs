use async_trait::async_trait;
use mygitpanel_core::models::ReviewComment;
use mygitpanel_core::store::ReviewCommentStore;
use mygitpanel_core::CoreResult;
use rusqlite::params;
use tokio_util::sync::CancellationToken;

use crate::conversions::{review_comment_from_row, review_comment_params};
use crate::SqliteStore;

const SELECT_COLUMNS: &str = "id, review_id, pr_id, author, body, path, line, start_line, side, \
    subject_type, diff_hunk, commit_id, is_resolved, is_outdated, in_reply_to_id, created_at, updated_at";

#[async_trait]
impl ReviewCommentStore for SqliteStore {
    async fn upsert_comment(&self, comment: &ReviewComment, _cancel: &CancellationToken) -> CoreResult<()> {
        let comment = comment.clone();
        self.pool
            .with_writer(move |conn| {
                let p = review_comment_params(&comment);
                conn.execute(
                    "INSERT INTO review_comments (
                        id, review_id, pr_id, author, body, path, line, start_line, side,
                        subject_type, diff_hunk, commit_id, is_resolved, is_outdated,
                        in_reply_to_id, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                    ON CONFLICT(id) DO UPDATE SET
                        review_id = excluded.review_id,
                        author = excluded.author,
                        body = excluded.body,
                        path = excluded.path,
                        line = excluded.line,
                        start_line = excluded.start_line,
                        side = excluded.side,
                        subject_type = excluded.subject_type,
                        diff_hunk = excluded.diff_hunk,
                        commit_id = excluded.commit_id,
                        is_outdated = excluded.is_outdated,
                        in_reply_to_id = excluded.in_reply_to_id,
                        updated_at = excluded.updated_at",
                    params![
                        comment.id,
                        comment.review_id,
                        comment.pr_id,
                        comment.author,
                        comment.body,
                        comment.path,
                        comment.line.map(|v| v as i64),
                        comment.start_line.map(|v| v as i64),
                        p.side,
                        p.subject_type,
                        comment.diff_hunk,
                        comment.commit_id,
                        p.is_resolved,
                        p.is_outdated,
                        comment.in_reply_to_id,
                        p.created_at,
                        p.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn list_by_pr(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<Vec<ReviewComment>> {
        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM review_comments WHERE pr_id = ?1 ORDER BY created_at ASC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([pr_id], review_comment_from_row)?;
                rows.collect()
            })
            .await
    }

    async fn set_resolution(
        &self,
        comment_id: i64,
        resolved: bool,
        _cancel: &CancellationToken,
    ) -> CoreResult<()> {
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "UPDATE review_comments SET is_resolved = ?1 WHERE id = ?2",
                    params![resolved as i64, comment_id],
                )?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mygitpanel_core::models::{
        CiStatus, MergeableStatus, PrStatus, PullRequest, Repository, SubjectType,
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

    fn comment(id: i64, pr_id: i64, in_reply_to_id: Option<i64>) -> ReviewComment {
        ReviewComment {
            id,
            review_id: None,
            pr_id,
            author: "bob".to_string(),
            body: "consider renaming this".to_string(),
            path: "src/lib.rs".to_string(),
            line: Some(42),
            start_line: None,
            side: None,
            subject_type: SubjectType::Line,
            diff_hunk: None,
            commit_id: "deadbeef".to_string(),
            is_resolved: false,
            is_outdated: false,
            in_reply_to_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn set_resolution_flips_is_resolved() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        store.upsert_comment(&comment(1, pr_id, None), &cancel).await.unwrap();
        store.set_resolution(1, true, &cancel).await.unwrap();

        let comments = store.list_by_pr(pr_id, &cancel).await.unwrap();
        assert!(comments[0].is_resolved);
    }

    #[tokio::test]
    async fn list_by_pr_preserves_reply_links() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        store.upsert_comment(&comment(1, pr_id, None), &cancel).await.unwrap();
        store.upsert_comment(&comment(2, pr_id, Some(1)), &cancel).await.unwrap();

        let comments = store.list_by_pr(pr_id, &cancel).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[1].in_reply_to_id, Some(1));
    }
}
