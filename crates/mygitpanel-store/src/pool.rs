//! One writer connection guarded by a `tokio::sync::Mutex`, plus a small
//! reader pool (spec §5: "typically 1 writer, ≤ 4 readers", WAL-style
//! journaling so reads stay concurrent with the single writer).

use std::sync::Arc;

use mygitpanel_core::CoreError;
use rusqlite::Connection;
use tokio::sync::Mutex;

const MAX_READERS: usize = 4;

pub struct Pool {
    path: String,
    writer: Arc<Mutex<Connection>>,
    readers: Arc<Mutex<Vec<Connection>>>,
    reader_count: std::sync::atomic::AtomicUsize,
}

impl Pool {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let writer = open_connection(path)?;
        writer.execute_batch(include_str!("schema.sql"))?;

        Ok(Self {
            path: path.to_string(),
            writer: Arc::new(Mutex::new(writer)),
            readers: Arc::new(Mutex::new(Vec::new())),
            reader_count: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// In-memory database for tests: a single shared connection used as
    /// both writer and reader (SQLite's `:memory:` DBs aren't visible
    /// across separate connections).
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        let writer = Arc::new(Mutex::new(conn));
        Ok(Self {
            path: ":memory:".to_string(),
            writer,
            readers: Arc::new(Mutex::new(Vec::new())),
            reader_count: std::sync::atomic::AtomicUsize::new(usize::MAX), // never open a second connection
        })
    }

    pub async fn with_writer<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let writer = self.writer.clone();
        tokio::task::spawn_blocking(move || {
            let conn = writer.blocking_lock();
            f(&conn)
        })
        .await
        .map_err(CoreError::store)?
        .map_err(CoreError::store)
    }

    pub async fn with_reader<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.path == ":memory:" {
            return self.with_writer(f).await;
        }

        let conn = self.checkout_reader().await.map_err(CoreError::store)?;
        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&conn);
            (conn, result)
        })
        .await
        .map_err(CoreError::store)?;
        self.checkin_reader(conn).await;
        result.map_err(CoreError::store)
    }

    async fn checkout_reader(&self) -> anyhow::Result<Connection> {
        {
            let mut pool = self.readers.lock().await;
            if let Some(conn) = pool.pop() {
                return Ok(conn);
            }
        }

        if self.reader_count.fetch_add(1, std::sync::atomic::Ordering::SeqCst) < MAX_READERS {
            open_connection(&self.path)
        } else {
            self.reader_count.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
            // Pool is saturated: block until a reader is returned rather
            // than opening past the cap.
            loop {
                {
                    let mut pool = self.readers.lock().await;
                    if let Some(conn) = pool.pop() {
                        return Ok(conn);
                    }
                }
                tokio::task::yield_now().await;
            }
        }
    }

    async fn checkin_reader(&self, conn: Connection) {
        let mut pool = self.readers.lock().await;
        pool.push(conn);
    }
}

fn open_connection(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(conn)
}
