//! Typed access to the two logical tables of an origin.
//!
//! Each table is one JSON array stored under a fixed key. A snapshot that
//! fails to parse reads as empty; the next write replaces it with whatever
//! records that write carries, and the unreadable contents are gone.

use std::fmt;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use tabchat_types::{Record, merge_records};

use crate::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Users,
    Messages,
}

impl Table {
    pub fn key(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Messages => "messages",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Parse a stored snapshot. Missing and corrupt snapshots both decode to an
/// empty table.
pub fn decode_snapshot<T: DeserializeOwned>(table: Table, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Corrupt {} snapshot, treating as empty: {}", table, e);
            Vec::new()
        }
    }
}

impl Database {
    /// Every record currently committed to `table`.
    pub fn load<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>> {
        let row = self.get_snapshot(table.key())?;
        Ok(decode_snapshot(table, row.as_ref().map(|r| r.value.as_str())))
    }

    /// Merge `records` into the committed snapshot of `table` and write it
    /// back. Returns the snapshot as committed.
    pub fn append<T>(&self, table: Table, records: &[T]) -> Result<Vec<T>>
    where
        T: Record + Serialize + DeserializeOwned,
    {
        self.update_snapshot(table.key(), |current| {
            let durable: Vec<T> = decode_snapshot(table, current);
            let merged = merge_records(durable, records);
            let encoded = serde_json::to_string(&merged)?;
            debug!("Committed {} {} record(s), {} total", records.len(), table, merged.len());
            Ok((encoded, merged))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabchat_types::{Message, User};
    use tempfile::tempdir;

    #[test]
    fn empty_tables_load_empty() {
        let db = Database::open_in_memory().unwrap();
        let users: Vec<User> = db.load(Table::Users).unwrap();
        let messages: Vec<Message> = db.load(Table::Messages).unwrap();
        assert!(users.is_empty());
        assert!(messages.is_empty());
    }

    #[test]
    fn append_keeps_earlier_commits() {
        let db = Database::open_in_memory().unwrap();
        db.append(Table::Users, &[User::new("alice")]).unwrap();
        db.append(Table::Users, &[User::new("bob")]).unwrap();
        db.append(Table::Users, &[User::new("alice")]).unwrap();

        let users: Vec<User> = db.load(Table::Users).unwrap();
        assert_eq!(users, vec![User::new("alice"), User::new("bob")]);
    }

    #[test]
    fn corrupt_snapshot_reads_empty_and_is_replaced_on_write() {
        let db = Database::open_in_memory().unwrap();
        db.put_snapshot("messages", "{not json").unwrap();

        let messages: Vec<Message> = db.load(Table::Messages).unwrap();
        assert!(messages.is_empty());

        let msg = Message::new("alice", "bob", "hi");
        let committed = db.append(Table::Messages, &[msg.clone()]).unwrap();
        assert_eq!(committed, vec![msg.clone()]);

        let messages: Vec<Message> = db.load(Table::Messages).unwrap();
        assert_eq!(messages, vec![msg]);
    }

    #[test]
    fn tables_do_not_share_records() {
        let db = Database::open_in_memory().unwrap();
        db.append(Table::Users, &[User::new("alice")]).unwrap();

        let messages: Vec<Message> = db.load(Table::Messages).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn commits_are_visible_to_other_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("origin.db");
        let first = Database::open(&path).unwrap();
        let second = Database::open(&path).unwrap();

        let a = Message::new("alice", "bob", "from first");
        let b = Message::new("bob", "alice", "from second");
        first.append(Table::Messages, &[a.clone()]).unwrap();
        second.append(Table::Messages, &[b.clone()]).unwrap();

        let seen: Vec<Message> = first.load(Table::Messages).unwrap();
        assert_eq!(seen, vec![a, b]);
    }

    #[test]
    fn snapshots_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("origin.db");
        {
            let db = Database::open(&path).unwrap();
            db.append(Table::Users, &[User::new("alice")]).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let users: Vec<User> = db.load(Table::Users).unwrap();
        assert_eq!(users, vec![User::new("alice")]);
    }
}
