use async_trait::async_trait;
use mygitpanel_core::models::BotConfig;
use mygitpanel_core::store::BotConfigStore;
use mygitpanel_core::CoreResult;
use tokio_util::sync::CancellationToken;

use crate::conversions::{parse_rfc3339, to_rfc3339};
use crate::SqliteStore;

#[async_trait]
impl BotConfigStore for SqliteStore {
    async fn list_bots(&self, _cancel: &CancellationToken) -> CoreResult<Vec<BotConfig>> {
        self.pool
            .with_reader(move |conn| {
                let mut stmt = conn.prepare("SELECT username, added_at FROM bot_configs ORDER BY username ASC")?;
                let rows = stmt.query_map([], |row| {
                    let added_at: String = row.get("added_at")?;
                    Ok((row.get::<_, String>("username")?, added_at))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    let (username, added_at) = row?;
                    out.push(BotConfig {
                        username,
                        added_at: parse_rfc3339(&added_at)?,
                    });
                }
                Ok(out)
            })
            .await
    }

    async fn add_bot(&self, username: &str, _cancel: &CancellationToken) -> CoreResult<()> {
        let username = username.to_string();
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO bot_configs (username, added_at) VALUES (?1, ?2) \
                     ON CONFLICT(username) DO NOTHING",
                    rusqlite::params![username, to_rfc3339(chrono::Utc::now())],
                )?;
                Ok(())
            })
            .await
    }

    async fn remove_bot(&self, username: &str, _cancel: &CancellationToken) -> CoreResult<()> {
        let username = username.to_string();
        self.pool
            .with_writer(move |conn| {
                conn.execute("DELETE FROM bot_configs WHERE username = ?1", [username])?;
                Ok(())
            })
            .await
    }
}
