use async_trait::async_trait;
use mygitpanel_core::models::PullRequest;
use mygitpanel_core::store::PullRequestStore;
use mygitpanel_core::CoreResult;
use rusqlite::{params, OptionalExtension};
use tokio_util::sync::CancellationToken;

use crate::conversions::{pr_params, pull_request_from_row};
use crate::SqliteStore;

const SELECT_COLUMNS: &str = "id, repo_full_name, number, title, author, status, is_draft, url, \
    branch, base_branch, labels, head_sha, additions, deletions, changed_files, \
    mergeable_status, ci_status, needs_review, opened_at, updated_at, last_activity_at";

#[async_trait]
impl PullRequestStore for SqliteStore {
    async fn list_by_repo(
        &self,
        repo_full_name: &str,
        _cancel: &CancellationToken,
    ) -> CoreResult<Vec<PullRequest>> {
        let repo_full_name = repo_full_name.to_string();
        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM pull_requests WHERE repo_full_name = ?1 ORDER BY number DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([&repo_full_name], pull_request_from_row)?;
                rows.collect()
            })
            .await
    }

    async fn get_by_number(
        &self,
        repo_full_name: &str,
        number: u64,
        _cancel: &CancellationToken,
    ) -> CoreResult<Option<PullRequest>> {
        let repo_full_name = repo_full_name.to_string();
        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM pull_requests WHERE repo_full_name = ?1 AND number = ?2"
                );
                conn.query_row(&sql, params![repo_full_name, number as i64], pull_request_from_row)
                    .optional()
            })
            .await
    }

    async fn get_by_id(&self, id: i64, _cancel: &CancellationToken) -> CoreResult<Option<PullRequest>> {
        self.pool
            .with_reader(move |conn| {
                let sql = format!("SELECT {SELECT_COLUMNS} FROM pull_requests WHERE id = ?1");
                conn.query_row(&sql, [id], pull_request_from_row).optional()
            })
            .await
    }

    async fn upsert(&self, pr: &PullRequest, _cancel: &CancellationToken) -> CoreResult<i64> {
        let pr = pr.clone();
        self.pool
            .with_writer(move |conn| {
                let p = pr_params(&pr);
                conn.execute(
                    "INSERT INTO pull_requests (
                        repo_full_name, number, title, author, status, is_draft, url, branch,
                        base_branch, labels, head_sha, additions, deletions, changed_files,
                        mergeable_status, ci_status, needs_review, opened_at, updated_at, last_activity_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
                    ON CONFLICT(repo_full_name, number) DO UPDATE SET
                        title = excluded.title,
                        author = excluded.author,
                        status = excluded.status,
                        is_draft = excluded.is_draft,
                        url = excluded.url,
                        branch = excluded.branch,
                        base_branch = excluded.base_branch,
                        labels = excluded.labels,
                        head_sha = excluded.head_sha,
                        additions = excluded.additions,
                        deletions = excluded.deletions,
                        changed_files = excluded.changed_files,
                        mergeable_status = excluded.mergeable_status,
                        ci_status = excluded.ci_status,
                        needs_review = excluded.needs_review,
                        opened_at = excluded.opened_at,
                        updated_at = excluded.updated_at,
                        last_activity_at = excluded.last_activity_at",
                    params![
                        pr.repo_full_name,
                        pr.number as i64,
                        pr.title,
                        pr.author,
                        p.status,
                        p.is_draft,
                        pr.url,
                        pr.branch,
                        pr.base_branch,
                        p.labels_json,
                        pr.head_sha,
                        pr.additions as i64,
                        pr.deletions as i64,
                        pr.changed_files as i64,
                        p.mergeable_status,
                        p.ci_status,
                        p.needs_review,
                        p.opened_at,
                        p.updated_at,
                        p.last_activity_at,
                    ],
                )?;

                conn.query_row(
                    "SELECT id FROM pull_requests WHERE repo_full_name = ?1 AND number = ?2",
                    params![pr.repo_full_name, pr.number as i64],
                    |row| row.get(0),
                )
            })
            .await
    }

    async fn delete(
        &self,
        repo_full_name: &str,
        number: u64,
        _cancel: &CancellationToken,
    ) -> CoreResult<bool> {
        let repo_full_name = repo_full_name.to_string();
        let affected = self
            .pool
            .with_writer(move |conn| {
                conn.execute(
                    "DELETE FROM pull_requests WHERE repo_full_name = ?1 AND number = ?2",
                    params![repo_full_name, number as i64],
                )
            })
            .await?;
        Ok(affected > 0)
    }

    async fn list_all_excluding_ignored(&self, _cancel: &CancellationToken) -> CoreResult<Vec<PullRequest>> {
        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM pull_requests p \
                     WHERE NOT EXISTS (SELECT 1 FROM ignored_prs i WHERE i.pr_id = p.id) \
                     ORDER BY last_activity_at DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], pull_request_from_row)?;
                rows.collect()
            })
            .await
    }

    async fn list_attention_excluding_ignored(
        &self,
        _cancel: &CancellationToken,
    ) -> CoreResult<Vec<PullRequest>> {
        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {SELECT_COLUMNS} FROM pull_requests p \
                     WHERE p.needs_review = 1 \
                     AND NOT EXISTS (SELECT 1 FROM ignored_prs i WHERE i.pr_id = p.id) \
                     ORDER BY last_activity_at DESC"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], pull_request_from_row)?;
                rows.collect()
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mygitpanel_core::models::{CiStatus, MergeableStatus, PrStatus, Repository};
    use mygitpanel_core::store::RepoStore;
    use crate::SqliteStore;

    async fn store_with_repo() -> SqliteStore {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();
        store
            .add_repo(
                Repository { owner: "octo".to_string(), name: "widgets".to_string(), added_at: Utc::now() },
                &cancel,
            )
            .await
            .unwrap();
        store
    }

    fn pr(number: u64, title: &str) -> PullRequest {
        PullRequest {
            id: None,
            repo_full_name: "octo/widgets".to_string(),
            number,
            title: title.to_string(),
            author: "alice".to_string(),
            status: PrStatus::Open,
            is_draft: false,
            url: format!("https://github.com/octo/widgets/pull/{number}"),
            branch: "feature".to_string(),
            base_branch: "main".to_string(),
            labels: vec!["needs-review".to_string()],
            head_sha: "deadbeef".to_string(),
            additions: 10,
            deletions: 2,
            changed_files: 3,
            mergeable_status: MergeableStatus::Mergeable,
            ci_status: CiStatus::Pending,
            needs_review: true,
            opened_at: Utc::now(),
            updated_at: Utc::now(),
            last_activity_at: Utc::now(),
            requested_reviewers: vec![],
            requested_team_slugs: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_returns_a_stable_surrogate_id_across_updates() {
        let store = store_with_repo().await;
        let cancel = CancellationToken::new();

        let id_first = store.upsert(&pr(1, "Add widgets"), &cancel).await.unwrap();
        let mut updated = pr(1, "Add widgets v2");
        updated.needs_review = false;
        let id_second = store.upsert(&updated, &cancel).await.unwrap();

        assert_eq!(id_first, id_second);
        let stored = store.get_by_number("octo/widgets", 1, &cancel).await.unwrap().unwrap();
        assert_eq!(stored.title, "Add widgets v2");
        assert!(!stored.needs_review);
    }

    #[tokio::test]
    async fn list_attention_excluding_ignored_only_returns_needs_review_and_unignored() {
        let store = store_with_repo().await;
        let cancel = CancellationToken::new();

        let mut quiet = pr(2, "Docs tweak");
        quiet.needs_review = false;
        store.upsert(&pr(1, "Needs review"), &cancel).await.unwrap();
        store.upsert(&quiet, &cancel).await.unwrap();

        let attention = store.list_attention_excluding_ignored(&cancel).await.unwrap();
        assert_eq!(attention.len(), 1);
        assert_eq!(attention[0].number, 1);
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = store_with_repo().await;
        let cancel = CancellationToken::new();
        store.upsert(&pr(1, "Add widgets"), &cancel).await.unwrap();

        assert!(store.delete("octo/widgets", 1, &cancel).await.unwrap());
        assert!(store.get_by_number("octo/widgets", 1, &cancel).await.unwrap().is_none());
    }
}
