use crate::error::CacheError;
use crate::models::HoldingRecord;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Durable mirror of the last holdings set received from the server, keyed by symbol.
#[async_trait]
pub trait LocalCache: Send + Sync {
    /// Replaces the whole cached set with `records`.
    async fn put(&self, records: &[HoldingRecord]) -> Result<(), CacheError>;

    /// Point-in-time snapshot of the cached set.
    async fn observe(&self) -> Result<Vec<HoldingRecord>, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

/// SQLite-backed holdings cache.
#[derive(Clone)]
pub struct SqliteHoldingCache {
    conn: Arc<Mutex<rusqlite::Connection>>,
    live: Arc<watch::Sender<Vec<HoldingRecord>>>,
}

impl SqliteHoldingCache {
    /// Open (or create) the cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = rusqlite::Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = rusqlite::Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: rusqlite::Connection) -> Result<Self, CacheError> {
        // Initialize schema for cached holdings
        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_holdings (
                symbol TEXT PRIMARY KEY,
                quantity INTEGER NOT NULL,
                avg_price REAL NOT NULL,
                ltp REAL NOT NULL,
                close REAL NOT NULL
            )",
            [],
        )?;

        let initial = read_all(&conn)?;
        let (live, _) = watch::channel(initial);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            live: Arc::new(live),
        })
    }

    /// Live view of the cache, republished after every successful write.
    pub fn subscribe(&self) -> watch::Receiver<Vec<HoldingRecord>> {
        self.live.subscribe()
    }
}

fn read_all(conn: &rusqlite::Connection) -> Result<Vec<HoldingRecord>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT symbol, quantity, avg_price, ltp, close FROM user_holdings ORDER BY rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(HoldingRecord {
            symbol: row.get(0)?,
            quantity: row.get(1)?,
            avg_price: row.get(2)?,
            ltp: row.get(3)?,
            close: row.get(4)?,
        })
    })?;
    let records = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

#[async_trait]
impl LocalCache for SqliteHoldingCache {
    async fn put(&self, records: &[HoldingRecord]) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().await;

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM user_holdings", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO user_holdings (symbol, quantity, avg_price, ltp, close)
                 VALUES (?, ?, ?, ?, ?)",
            )?;
            for record in records {
                stmt.execute(rusqlite::params![
                    &record.symbol,
                    record.quantity,
                    record.avg_price,
                    record.ltp,
                    record.close,
                ])?;
            }
        }
        tx.commit()?;

        let snapshot = read_all(&conn)?;
        tracing::debug!("Cached {} holdings", snapshot.len());
        self.live.send_replace(snapshot);
        Ok(())
    }

    async fn observe(&self) -> Result<Vec<HoldingRecord>, CacheError> {
        let conn = self.conn.lock().await;
        Ok(read_all(&conn)?)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM user_holdings", [])?;
        self.live.send_replace(Vec::new());
        Ok(())
    }
}
