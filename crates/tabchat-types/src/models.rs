use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered chat user. The username is the identity key and is compared
/// case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// A direct message between two users.
///
/// Everything except the two tombstone flags is fixed at creation. The flags
/// only ever go from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub chat_cleared_for_from_user: bool,
    #[serde(default)]
    pub chat_cleared_for_to_user: bool,
}

/// Which side of a message an identity stands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Perspective {
    Sender,
    Recipient,
}

impl Message {
    pub fn new(from: impl Into<String>, to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from: from.into(),
            to: to.into(),
            body: body.into(),
            timestamp: Utc::now(),
            chat_cleared_for_from_user: false,
            chat_cleared_for_to_user: false,
        }
    }

    /// True if this message belongs to the conversation between `a` and `b`,
    /// in either direction.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// The side `identity` occupies on this message. The sender side wins for
    /// a message addressed to oneself.
    pub fn perspective_of(&self, identity: &str) -> Option<Perspective> {
        if self.from == identity {
            Some(Perspective::Sender)
        } else if self.to == identity {
            Some(Perspective::Recipient)
        } else {
            None
        }
    }

    pub fn is_cleared_for(&self, perspective: Perspective) -> bool {
        match perspective {
            Perspective::Sender => self.chat_cleared_for_from_user,
            Perspective::Recipient => self.chat_cleared_for_to_user,
        }
    }

    /// Raise the tombstone flag for `perspective`. Returns `true` if the flag
    /// was newly raised.
    pub fn clear_for(&mut self, perspective: Perspective) -> bool {
        let flag = match perspective {
            Perspective::Sender => &mut self.chat_cleared_for_from_user,
            Perspective::Recipient => &mut self.chat_cleared_for_to_user,
        };
        let changed = !*flag;
        *flag = true;
        changed
    }

    /// Hidden from `identity`'s view of the conversation.
    pub fn is_hidden_from(&self, identity: &str) -> bool {
        self.perspective_of(identity)
            .is_some_and(|p| self.is_cleared_for(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_is_directional() {
        let msg = Message::new("alice", "bob", "hi");
        assert_eq!(msg.perspective_of("alice"), Some(Perspective::Sender));
        assert_eq!(msg.perspective_of("bob"), Some(Perspective::Recipient));
        assert_eq!(msg.perspective_of("carol"), None);
        assert_eq!(msg.perspective_of("Alice"), None);
    }

    #[test]
    fn clear_for_only_raises() {
        let mut msg = Message::new("alice", "bob", "hi");
        assert!(msg.clear_for(Perspective::Sender));
        assert!(!msg.clear_for(Perspective::Sender));
        assert!(msg.chat_cleared_for_from_user);
        assert!(!msg.chat_cleared_for_to_user);
        assert!(msg.is_hidden_from("alice"));
        assert!(!msg.is_hidden_from("bob"));
    }

    #[test]
    fn storage_format_uses_camel_case_and_ignores_unknown_fields() {
        let msg = Message::new("alice", "bob", "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["chatClearedForFromUser"], false);
        assert_eq!(json["chatClearedForToUser"], false);

        let raw = format!(
            r#"{{"id":"{}","from":"alice","to":"bob","body":"hi","timestamp":"2024-01-01T00:00:00Z","avatar":"x"}}"#,
            msg.id
        );
        let parsed: Message = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.id, msg.id);
        assert!(!parsed.chat_cleared_for_from_user);
        assert!(!parsed.chat_cleared_for_to_user);
    }
}
