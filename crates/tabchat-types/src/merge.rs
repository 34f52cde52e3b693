use std::collections::HashMap;
use std::hash::Hash;

use uuid::Uuid;

use crate::models::{Message, User};

/// A record stored in an append-only, keyed table.
pub trait Record: Clone {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;

    /// Fold a record with the same key into `self`. Must be idempotent and
    /// commutative. Returns `true` if `self` changed.
    fn absorb(&mut self, other: &Self) -> bool;
}

impl Record for User {
    type Key = String;

    fn key(&self) -> String {
        self.username.clone()
    }

    fn absorb(&mut self, _other: &Self) -> bool {
        false
    }
}

impl Record for Message {
    type Key = Uuid;

    fn key(&self) -> Uuid {
        self.id
    }

    /// Tombstone flags are OR-merged; nothing else on a message may change.
    fn absorb(&mut self, other: &Self) -> bool {
        let mut changed = false;
        if other.chat_cleared_for_from_user && !self.chat_cleared_for_from_user {
            self.chat_cleared_for_from_user = true;
            changed = true;
        }
        if other.chat_cleared_for_to_user && !self.chat_cleared_for_to_user {
            self.chat_cleared_for_to_user = true;
            changed = true;
        }
        changed
    }
}

/// Union `incoming` into `durable` by key.
///
/// Existing records keep their position and absorb duplicates; unseen records
/// are appended in the order they appear in `incoming`. Duplicates inside
/// `durable` itself collapse onto their first occurrence.
pub fn merge_records<T: Record>(durable: Vec<T>, incoming: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(durable.len() + incoming.len());
    let mut index: HashMap<T::Key, usize> = HashMap::with_capacity(merged.capacity());

    for record in durable.iter().chain(incoming.iter()) {
        match index.get(&record.key()) {
            Some(&pos) => {
                merged[pos].absorb(record);
            }
            None => {
                index.insert(record.key(), merged.len());
                merged.push(record.clone());
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(messages: &[Message]) -> Vec<Uuid> {
        messages.iter().map(|m| m.id).collect()
    }

    #[test]
    fn keeps_durable_records_and_appends_new_ones() {
        let a = Message::new("alice", "bob", "one");
        let b = Message::new("bob", "alice", "two");
        let c = Message::new("alice", "bob", "three");

        let merged = merge_records(vec![a.clone(), b.clone()], &[c.clone()]);
        assert_eq!(ids(&merged), vec![a.id, b.id, c.id]);
    }

    #[test]
    fn duplicates_collapse_and_flags_only_rise() {
        let original = Message::new("alice", "bob", "hi");
        let mut cleared = original.clone();
        cleared.chat_cleared_for_from_user = true;

        let merged = merge_records(vec![cleared.clone()], &[original.clone(), original.clone()]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].chat_cleared_for_from_user);

        let merged = merge_records(vec![original], &[cleared]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].chat_cleared_for_from_user);
        assert!(!merged[0].chat_cleared_for_to_user);
    }

    #[test]
    fn order_of_merges_does_not_change_the_result_set() {
        let a = Message::new("alice", "bob", "a");
        let mut b = Message::new("bob", "alice", "b");
        let mut b_cleared = b.clone();
        b_cleared.chat_cleared_for_to_user = true;

        let left = merge_records(merge_records(vec![a.clone()], &[b.clone()]), &[b_cleared.clone()]);
        let right = merge_records(merge_records(vec![b_cleared], &[a]), &[b.clone()]);

        let mut left_ids = ids(&left);
        let mut right_ids = ids(&right);
        left_ids.sort();
        right_ids.sort();
        assert_eq!(left_ids, right_ids);

        b.chat_cleared_for_to_user = true;
        assert!(left.contains(&b));
        assert!(right.contains(&b));
    }

    #[test]
    fn users_are_keyed_by_username() {
        let merged = merge_records(
            vec![User::new("alice")],
            &[User::new("bob"), User::new("alice"), User::new("Alice")],
        );
        let names: Vec<&str> = merged.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "Alice"]);
    }
}
