use async_trait::async_trait;
use mygitpanel_core::models::CheckRun;
use mygitpanel_core::store::CheckRunStore;
use mygitpanel_core::CoreResult;
use rusqlite::params;
use tokio_util::sync::CancellationToken;

use crate::conversions::{check_run_from_row, check_run_params};
use crate::SqliteStore;

#[async_trait]
impl CheckRunStore for SqliteStore {
    async fn replace_for_pr(
        &self,
        pr_id: i64,
        runs: Vec<CheckRun>,
        _cancel: &CancellationToken,
    ) -> CoreResult<()> {
        self.pool
            .with_writer(move |conn| {
                // A transaction is what makes this replacement atomic:
                // a mid-way failure rolls back to the prior complete set
                // instead of leaving readers a partial one.
                let tx = conn.unchecked_transaction()?;
                tx.execute("DELETE FROM check_runs WHERE pr_id = ?1", [pr_id])?;
                for run in &runs {
                    let p = check_run_params(run);
                    tx.execute(
                        "INSERT INTO check_runs (
                            id, pr_id, name, status, conclusion, is_required,
                            details_url, started_at, completed_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            run.id,
                            pr_id,
                            run.name,
                            p.status,
                            p.conclusion,
                            p.is_required,
                            run.details_url,
                            p.started_at,
                            p.completed_at,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
    }

    async fn list_by_pr(&self, pr_id: i64, _cancel: &CancellationToken) -> CoreResult<Vec<CheckRun>> {
        self.pool
            .with_reader(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, pr_id, name, status, conclusion, is_required, details_url, started_at, completed_at \
                     FROM check_runs WHERE pr_id = ?1 ORDER BY name ASC",
                )?;
                let rows = stmt.query_map([pr_id], check_run_from_row)?;
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
        CheckConclusion, CheckRunStatus, CiStatus, MergeableStatus, PrStatus, PullRequest, Repository,
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

    fn run(id: i64, pr_id: i64, status: CheckRunStatus, conclusion: Option<CheckConclusion>) -> CheckRun {
        CheckRun {
            id,
            pr_id,
            name: "build".to_string(),
            status,
            conclusion,
            is_required: true,
            details_url: None,
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn replace_for_pr_is_atomic_and_overwrites_the_prior_set() {
        let (store, pr_id) = store_with_pr().await;
        let cancel = CancellationToken::new();

        store
            .replace_for_pr(pr_id, vec![run(1, pr_id, CheckRunStatus::InProgress, None)], &cancel)
            .await
            .unwrap();
        store
            .replace_for_pr(
                pr_id,
                vec![run(2, pr_id, CheckRunStatus::Completed, Some(CheckConclusion::Success))],
                &cancel,
            )
            .await
            .unwrap();

        let runs = store.list_by_pr(pr_id, &cancel).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, 2);
        assert_eq!(runs[0].conclusion, Some(CheckConclusion::Success));
    }
}
