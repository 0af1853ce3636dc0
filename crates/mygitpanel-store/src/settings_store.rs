use async_trait::async_trait;
use mygitpanel_core::models::ThresholdOverrides;
use mygitpanel_core::store::SettingsStore;
use mygitpanel_core::CoreResult;
use rusqlite::{params, OptionalExtension};
use tokio_util::sync::CancellationToken;

use crate::SqliteStore;

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_overrides(
        &self,
        repo_full_name: &str,
        _cancel: &CancellationToken,
    ) -> CoreResult<ThresholdOverrides> {
        let repo_full_name = repo_full_name.to_string();
        self.pool
            .with_reader(move |conn| {
                let overrides = conn
                    .query_row(
                        "SELECT review_count_threshold, age_urgency_days, stale_review_enabled, ci_failure_enabled \
                         FROM repo_threshold_overrides WHERE repo_full_name = ?1",
                        [&repo_full_name],
                        |row| {
                            Ok(ThresholdOverrides {
                                review_count_threshold: row
                                    .get::<_, Option<i64>>(0)?
                                    .map(|v| v as u32),
                                age_urgency_days: row.get::<_, Option<i64>>(1)?.map(|v| v as u32),
                                stale_review_enabled: row
                                    .get::<_, Option<i64>>(2)?
                                    .map(|v| v != 0),
                                ci_failure_enabled: row
                                    .get::<_, Option<i64>>(3)?
                                    .map(|v| v != 0),
                            })
                        },
                    )
                    .optional()?
                    .unwrap_or_default();
                Ok(overrides)
            })
            .await
    }

    async fn set_overrides(
        &self,
        repo_full_name: &str,
        overrides: ThresholdOverrides,
        _cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let repo_full_name = repo_full_name.to_string();
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO repo_threshold_overrides (
                        repo_full_name, review_count_threshold, age_urgency_days,
                        stale_review_enabled, ci_failure_enabled
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(repo_full_name) DO UPDATE SET
                        review_count_threshold = excluded.review_count_threshold,
                        age_urgency_days = excluded.age_urgency_days,
                        stale_review_enabled = excluded.stale_review_enabled,
                        ci_failure_enabled = excluded.ci_failure_enabled",
                    params![
                        repo_full_name,
                        overrides.review_count_threshold.map(|v| v as i64),
                        overrides.age_urgency_days.map(|v| v as i64),
                        overrides.stale_review_enabled.map(|v| v as i64),
                        overrides.ci_failure_enabled.map(|v| v as i64),
                    ],
                )?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mygitpanel_core::store::SettingsStore as _;

    #[tokio::test]
    async fn missing_overrides_row_returns_default() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();
        let overrides = store.get_overrides("octo/widgets", &cancel).await.unwrap();
        assert_eq!(overrides, ThresholdOverrides::default());
    }

    #[tokio::test]
    async fn set_then_get_round_trips_partial_overrides() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let cancel = CancellationToken::new();
        let overrides = ThresholdOverrides {
            review_count_threshold: Some(2),
            age_urgency_days: None,
            stale_review_enabled: Some(false),
            ci_failure_enabled: None,
        };
        store
            .set_overrides("octo/widgets", overrides, &cancel)
            .await
            .unwrap();

        let read_back = store.get_overrides("octo/widgets", &cancel).await.unwrap();
        assert_eq!(read_back.review_count_threshold, Some(2));
        assert_eq!(read_back.age_urgency_days, None);
        assert_eq!(read_back.stale_review_enabled, Some(false));
    }
}
