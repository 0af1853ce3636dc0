use async_trait::async_trait;
use mygitpanel_core::models::IgnoredPr;
use mygitpanel_core::store::IgnoredPrStore;
use mygitpanel_core::CoreResult;
use rusqlite::OptionalExtension;
use tokio_util::sync::CancellationToken;

use crate::conversions::{parse_rfc3339, to_rfc3339};
use crate::SqliteStore;

#[async_trait]
impl IgnoredPrStore for SqliteStore {
    async fn ignore(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<()> {
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO ignored_prs (pr_id, ignored_at) VALUES (?1, ?2) \
                     ON CONFLICT(pr_id) DO NOTHING",
                    rusqlite::params![pr_id, to_rfc3339(chrono::Utc::now())],
                )?;
                Ok(())
            })
            .await
    }

    async fn unignore(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<()> {
        self.pool
            .with_writer(move |conn| {
                conn.execute("DELETE FROM ignored_prs WHERE pr_id = ?1", [pr_id])?;
                Ok(())
            })
            .await
    }

    async fn is_ignored(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<bool> {
        self.pool
            .with_reader(move |conn| {
                let exists: Option<i64> = conn
                    .query_row("SELECT pr_id FROM ignored_prs WHERE pr_id = ?1", [pr_id], |row| row.get(0))
                    .optional()?;
                Ok(exists.is_some())
            })
            .await
    }

    async fn list_ignored(&self, _cancel: &CancellationToken) -> CoreResult<Vec<IgnoredPr>> {
        self.pool
            .with_reader(move |conn| {
                let mut stmt = conn.prepare("SELECT pr_id, ignored_at FROM ignored_prs ORDER BY ignored_at ASC")?;
                let rows = stmt.query_map([], |row| {
                    let ignored_at: String = row.get("ignored_at")?;
                    Ok((row.get::<_, i64>("pr_id")?, ignored_at))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    let (pr_id, ignored_at) = row?;
                    out.push(IgnoredPr {
                        pr_id,
                        ignored_at: parse_rfc3339(&ignored_at)?,
                    });
                }
                Ok(out)
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
    async fn ignore_then_unignore_round_trips() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        assert!(!store.is_ignored(pr_id, &cancel).await.unwrap());
        store.ignore(pr_id, &cancel).await.unwrap();
        assert!(store.is_ignored(pr_id, &cancel).await.unwrap());
        assert_eq!(store.list_ignored(&cancel).await.unwrap().len(), 1);

        store.unignore(pr_id, &cancel).await.unwrap();
        assert!(!store.is_ignored(pr_id, &cancel).await.unwrap());
    }

    #[tokio::test]
    async fn ignore_is_idempotent() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        store.ignore(pr_id, &cancel).await.unwrap();
        store.ignore(pr_id, &cancel).await.unwrap();
        assert_eq!(store.list_ignored(&cancel).await.unwrap().len(), 1);
    }
}
