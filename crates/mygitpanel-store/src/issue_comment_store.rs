use async_trait::async_trait;
use mygitpanel_core::models::IssueComment;
use mygitpanel_core::store::IssueCommentStore;
use mygitpanel_core::CoreResult;
use rusqlite::params;
use tokio_util::sync::CancellationToken;

use crate::conversions::{issue_comment_from_row, to_rfc3339};
use crate::SqliteStore;

#[async_trait]
impl IssueCommentStore for SqliteStore {
    async fn upsert(&self, comment: &IssueComment, _cancel: &CancellationToken) -> CoreResult<()> {
        let comment = comment.clone();
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO issue_comments (id, pr_id, author, body, is_bot, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                        author = excluded.author,
                        body = excluded.body,
                        is_bot = excluded.is_bot,
                        updated_at = excluded.updated_at",
                    params![
                        comment.id,
                        comment.pr_id,
                        comment.author,
                        comment.body,
                        comment.is_bot as i64,
                        to_rfc3339(comment.created_at),
                        to_rfc3339(comment.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    async fn list_by_pr(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<Vec<IssueComment>> {
        self.pool
            .with_reader(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, pr_id, author, body, is_bot, created_at, updated_at \
                     FROM issue_comments WHERE pr_id = ?1 ORDER BY created_at ASC",
                )?;
                let rows = stmt.query_map([pr_id], issue_comment_from_row)?;
                rows.collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mygitpanel_core::models::{CiStatus, MergeableStatus, PrStatus, PullRequest, Repository};
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

    #[tokio::test]
    async fn upsert_updates_body_on_conflict() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        let mut comment = IssueComment {
            id: 1,
            pr_id,
            author: "carol".to_string(),
            body: "ping".to_string(),
            is_bot: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        store.upsert(&comment, &cancel).await.unwrap();

        comment.body = "ping, updated".to_string();
        store.upsert(&comment, &cancel).await.unwrap();

        let comments = store.list_by_pr(pr_id, &cancel).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "ping, updated");
    }
}
