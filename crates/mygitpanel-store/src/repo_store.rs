use async_trait::async_trait;
use mygitpanel_core::models::Repository;
use mygitpanel_core::store::RepoStore;
use mygitpanel_core::{CoreError, CoreResult};
use rusqlite::OptionalExtension;
use tokio_util::sync::CancellationToken;

use crate::conversions::{parse_rfc3339, to_rfc3339};
use crate::SqliteStore;

#[async_trait]
impl RepoStore for SqliteStore {
    async fn list_repos(&self, _cancel: &CancellationToken) -> CoreResult<Vec<Repository>> {
        self.pool
            .with_reader(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT owner, name, added_at FROM repos ORDER BY full_name ASC",
                )?;
                let rows = stmt.query_map([], |row| {
                    let added_at: String = row.get("added_at")?;
                    Ok((row.get::<_, String>("owner")?, row.get::<_, String>("name")?, added_at))
                })?;
                let mut repos = Vec::new();
                for row in rows {
                    let (owner, name, added_at) = row?;
                    repos.push(Repository {
                        owner,
                        name,
                        added_at: parse_rfc3339(&added_at)?,
                    });
                }
                Ok(repos)
            })
            .await
    }

    async fn get_repo(
        &self,
        full_name: &str,
        _cancel: &CancellationToken,
    ) -> CoreResult<Option<Repository>> {
        let full_name = full_name.to_string();
        self.pool
            .with_reader(move |conn| {
                conn.query_row(
                    "SELECT owner, name, added_at FROM repos WHERE full_name = ?1",
                    [&full_name],
                    |row| {
                        let added_at: String = row.get("added_at")?;
                        Ok((row.get::<_, String>("owner")?, row.get::<_, String>("name")?, added_at))
                    },
                )
                .optional()?
                .map(|(owner, name, added_at)| {
                    Ok(Repository {
                        owner,
                        name,
                        added_at: parse_rfc3339(&added_at)?,
                    })
                })
                .transpose()
            })
            .await
    }

    async fn add_repo(&self, repo: Repository, _cancel: &CancellationToken) -> CoreResult<()> {
        let full_name = repo.full_name();
        let result = self
            .pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO repos (full_name, owner, name, added_at) VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![full_name, repo.owner, repo.name, to_rfc3339(repo.added_at)],
                )
            })
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(CoreError::Store(msg)) if msg.contains("UNIQUE constraint failed") => {
                Err(CoreError::Conflict(format!("repo {} is already tracked", repo.full_name())))
            }
            Err(other) => Err(other),
        }
    }

    async fn delete_repo(&self, full_name: &str, _cancel: &CancellationToken) -> CoreResult<bool> {
        let full_name = full_name.to_string();
        let affected = self
            .pool
            .with_writer(move |conn| conn.execute("DELETE FROM repos WHERE full_name = ?1", [&full_name]))
            .await?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteStore;

    fn repo(owner: &str, name: &str) -> Repository {
        Repository {
            owner: owner.to_string(),
            name: name.to_string(),
            added_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn add_then_list_returns_the_repo_in_full_name_order() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();

        store.add_repo(repo("octo", "zeta"), &cancel).await.unwrap();
        store.add_repo(repo("octo", "alpha"), &cancel).await.unwrap();

        let repos = store.list_repos(&cancel).await.unwrap();
        assert_eq!(
            repos.iter().map(Repository::full_name).collect::<Vec<_>>(),
            vec!["octo/alpha".to_string(), "octo/zeta".to_string()],
        );
    }

    #[tokio::test]
    async fn add_repo_twice_conflicts() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();

        store.add_repo(repo("octo", "widgets"), &cancel).await.unwrap();
        let err = store.add_repo(repo("octo", "widgets"), &cancel).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_repo_reports_whether_a_row_was_removed() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();

        store.add_repo(repo("octo", "widgets"), &cancel).await.unwrap();
        assert!(store.delete_repo("octo/widgets", &cancel).await.unwrap());
        assert!(!store.delete_repo("octo/widgets", &cancel).await.unwrap());
        assert!(store.get_repo("octo/widgets", &cancel).await.unwrap().is_none());
    }
}
