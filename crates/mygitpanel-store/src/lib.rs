//! SQLite-backed implementation of every `mygitpanel-core::store` port.
//!
//! Ambient persistence choice (spec names the store out of core scope,
//! but the binary needs one to run): `rusqlite` with the bundled SQLite,
//! WAL journaling, one writer connection and a small reader pool. No
//! migrations framework — schema changes are additive `CREATE TABLE IF
//! NOT EXISTS` statements in `schema.sql`, executed idempotently at open.

mod conversions;
mod pool;

mod bot_config_store;
mod check_run_store;
mod credential_store;
mod ignored_pr_store;
mod issue_comment_store;
mod pull_request_store;
mod repo_store;
mod review_comment_store;
mod review_store;
mod settings_store;

pub use pool::Pool;

/// The SQLite-backed implementation of [`mygitpanel_core::store::Store`].
///
/// Cloning is cheap: the writer mutex and reader pool are held behind
/// `Arc`s inside [`Pool`], so every clone shares the same underlying
/// connections.
#[derive(Clone)]
pub struct SqliteStore {
    pool: std::sync::Arc<Pool>,
    secret_key: Option<[u8; 32]>,
}

impl SqliteStore {
    pub fn open(db_path: &str, secret_key: Option<[u8; 32]>) -> anyhow::Result<Self> {
        let pool = Pool::open(db_path)?;
        Ok(Self {
            pool: std::sync::Arc::new(pool),
            secret_key,
        })
    }

    pub fn open_in_memory(secret_key: Option<[u8; 32]>) -> anyhow::Result<Self> {
        let pool = Pool::open_in_memory()?;
        Ok(Self {
            pool: std::sync::Arc::new(pool),
            secret_key,
        })
    }
}
