use serde::{Deserialize, Serialize};

use crate::models::{Message, User};

/// Notifications carried on the `message-update` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MessageEvent {
    /// A context committed a new message.
    ///
    /// `message_list` is the publisher's view of the log at publish time. It
    /// may be stale relative to the receiver and is only a hint.
    MessageCreate {
        message: Message,
        #[serde(rename = "messageList")]
        message_list: Vec<Message>,
    },

    /// Tombstone flags were raised on these records.
    MessagesCleared { messages: Vec<Message> },
}

/// Notifications carried on the `user-update` channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    UserRegistered { user: User },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_create_payload_shape() {
        let message = Message::new("alice", "bob", "hi");
        let event = MessageEvent::MessageCreate {
            message: message.clone(),
            message_list: vec![],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MessageCreate");
        assert_eq!(json["data"]["message"]["from"], "alice");
        assert!(json["data"]["messageList"].as_array().unwrap().is_empty());
    }
}
