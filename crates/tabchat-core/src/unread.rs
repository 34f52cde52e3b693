use std::collections::HashMap;

use tabchat_types::Message;

/// Unread message counts per sender for the active identity.
///
/// A sender with nothing unread has no entry; a present entry is at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnreadTracker {
    counts: HashMap<String, usize>,
}

impl UnreadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `message` if it was sent to `active` by someone else. Returns
    /// `true` if it was counted.
    pub fn record(&mut self, active: &str, message: &Message) -> bool {
        if message.to != active || message.from == active {
            return false;
        }
        *self.counts.entry(message.from.clone()).or_insert(0) += 1;
        true
    }

    pub fn mark_read(&mut self, sender: &str) {
        self.counts.remove(sender);
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn count(&self, sender: &str) -> usize {
        self.counts.get(sender).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<String, usize> {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_messages_addressed_to_active() {
        let mut unread = UnreadTracker::new();
        assert!(unread.record("bob", &Message::new("alice", "bob", "1")));
        assert!(!unread.record("bob", &Message::new("bob", "alice", "2")));
        assert!(!unread.record("bob", &Message::new("alice", "carol", "3")));
        assert!(!unread.record("bob", &Message::new("bob", "bob", "note to self")));

        assert_eq!(unread.count("alice"), 1);
        assert_eq!(unread.total(), 1);
    }

    #[test]
    fn mark_read_removes_the_entry() {
        let mut unread = UnreadTracker::new();
        for _ in 0..3 {
            unread.record("bob", &Message::new("alice", "bob", "ping"));
        }
        unread.record("bob", &Message::new("carol", "bob", "yo"));
        assert_eq!(unread.count("alice"), 3);

        unread.mark_read("alice");
        assert!(!unread.counts().contains_key("alice"));
        assert_eq!(unread.count("alice"), 0);
        assert_eq!(unread.count("carol"), 1);

        unread.reset();
        assert!(unread.counts().is_empty());
    }
}
