use crate::Database;
use crate::models::SnapshotRow;
use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};

impl Database {
    pub fn get_snapshot(&self, key: &str) -> Result<Option<SnapshotRow>> {
        self.with_conn(|conn| query_snapshot(conn, key))
    }

    /// Overwrite the snapshot stored under `key`.
    pub fn put_snapshot(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| write_snapshot(conn, key, value))
    }

    /// Read-modify-write of one snapshot.
    ///
    /// `f` receives the current value (if any) and returns the value to store
    /// plus a result to hand back. The read and the write share one IMMEDIATE
    /// transaction, so writers on other connections to the same file wait
    /// instead of interleaving.
    pub fn update_snapshot<F, T>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce(Option<&str>) -> Result<(String, T)>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let current = query_snapshot(&tx, key)?;
            let (next, out) = f(current.as_ref().map(|row| row.value.as_str()))?;
            write_snapshot(&tx, key, &next)?;
            tx.commit()?;
            Ok(out)
        })
    }
}

fn query_snapshot(conn: &Connection, key: &str) -> Result<Option<SnapshotRow>> {
    let mut stmt = conn.prepare("SELECT key, value, updated_at FROM storage WHERE key = ?1")?;

    let row = stmt
        .query_row([key], |row| {
            Ok(SnapshotRow {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn write_snapshot(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO storage (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, value),
    )?;
    Ok(())
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
