use std::collections::HashMap;

use uuid::Uuid;

use tabchat_types::{Message, Perspective, Record};

/// What [`MessageLog::append`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// The id was new; the record now sits at the end of the log.
    Inserted,
    /// The id was known and the record raised a tombstone flag on it.
    Updated,
    /// The id was known and nothing changed.
    Unchanged,
}

/// Append-only, id-deduplicated message log.
///
/// Log order is the order records reached this log. With several writers that
/// is not a global causal order, and nothing here tries to make it one.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    /// message id -> position in `messages`
    index: HashMap<Uuid, usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = Message>) -> Self {
        let mut log = Self::new();
        for record in records {
            log.append(record);
        }
        log
    }

    /// Insert `message` unless its id is already present. A known id only
    /// contributes tombstone flags the local copy is missing.
    pub fn append(&mut self, message: Message) -> Merge {
        match self.index.get(&message.id) {
            Some(&pos) => {
                if self.messages[pos].absorb(&message) {
                    Merge::Updated
                } else {
                    Merge::Unchanged
                }
            }
            None => {
                self.index.insert(message.id, self.messages.len());
                self.messages.push(message);
                Merge::Inserted
            }
        }
    }

    /// Raise one tombstone flag. Returns `true` if it was not already set.
    pub fn set_cleared_flag(&mut self, id: Uuid, perspective: Perspective) -> bool {
        match self.index.get(&id) {
            Some(&pos) => self.messages[pos].clear_for(perspective),
            None => false,
        }
    }

    /// Hide the whole `identity`/`peer` conversation from `identity`. Returns
    /// the records whose flag was newly raised.
    pub fn clear_conversation(&mut self, identity: &str, peer: &str) -> Vec<Message> {
        let targets: Vec<(Uuid, Perspective)> = self
            .messages
            .iter()
            .filter(|m| m.is_between(identity, peer))
            .filter_map(|m| m.perspective_of(identity).map(|p| (m.id, p)))
            .collect();

        let mut changed = Vec::new();
        for (id, perspective) in targets {
            if self.set_cleared_flag(id, perspective) {
                if let Some(message) = self.get(id) {
                    changed.push(message.clone());
                }
            }
        }
        changed
    }

    /// `identity`'s view of its conversation with `peer`, in log order.
    pub fn visible_to<'a>(
        &'a self,
        identity: &'a str,
        peer: &'a str,
    ) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages
            .iter()
            .filter(move |m| m.is_between(identity, peer))
            .filter(move |m| !m.is_hidden_from(identity))
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.index.get(&id).map(|&pos| &self.messages[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.messages.iter().map(|m| m.id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Owned copy of the whole log, in log order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
