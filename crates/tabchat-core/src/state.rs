use tracing::debug;

use tabchat_types::{Message, User};

use crate::directory::Directory;
use crate::error::{ChatError, Result, validate_username};
use crate::message_log::{Merge, MessageLog};
use crate::session::Session;
use crate::unread::UnreadTracker;

/// Everything that can happen to a context's state.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Login(String),
    Logout,
    /// Open the conversation with this peer.
    Select(String),
    MarkRead(String),
    /// A message written by this context. Its sender is the active identity,
    /// so it never counts as unread.
    Append(Message),
    /// A message another context announced.
    Receive(Message),
    /// Records learned from a snapshot: a broadcast hint or a storage read.
    /// Gaps it fills count as unread like announced messages do.
    Hint(Vec<Message>),
    /// Hide the conversation with this peer from the active identity.
    Clear(String),
    Register(User),
}

/// In-memory state of one context, driven only through [`ChatState::reduce`].
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    log: MessageLog,
    directory: Directory,
    session: Session,
    unread: UnreadTracker,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn unread(&self) -> &UnreadTracker {
        &self.unread
    }

    /// Apply one event. Returns the messages it inserted or modified, as they
    /// now stand in the log.
    pub fn reduce(&mut self, event: ChatEvent) -> Result<Vec<Message>> {
        match event {
            ChatEvent::Login(identity) => {
                validate_username(&identity)?;
                self.session = Session::logged_in(identity);
                self.unread.reset();
                Ok(Vec::new())
            }

            ChatEvent::Logout => {
                self.session = Session::LoggedOut;
                self.unread.reset();
                Ok(Vec::new())
            }

            ChatEvent::Select(peer) => {
                let session = self.session.select(peer.as_str()).ok_or(ChatError::NotLoggedIn)?;
                self.session = session;
                self.unread.mark_read(&peer);
                Ok(Vec::new())
            }

            ChatEvent::MarkRead(sender) => {
                self.unread.mark_read(&sender);
                Ok(Vec::new())
            }

            ChatEvent::Append(message) => Ok(self.merge(message).into_iter().collect()),

            ChatEvent::Receive(message) => Ok(self.merge(message).into_iter().collect()),

            ChatEvent::Hint(messages) => Ok(messages
                .into_iter()
                .filter_map(|m| self.merge(m))
                .collect()),

            ChatEvent::Clear(peer) => {
                let identity = self.session.identity().ok_or(ChatError::NotLoggedIn)?;
                Ok(self.log.clear_conversation(identity, &peer))
            }

            ChatEvent::Register(user) => {
                let username = user.username.clone();
                if self.directory.register(user) {
                    debug!("Directory learned {}", username);
                }
                Ok(Vec::new())
            }
        }
    }

    /// Merge one record into the log. A newly inserted record addressed to the
    /// active identity counts as unread no matter how it arrived.
    fn merge(&mut self, message: Message) -> Option<Message> {
        let id = message.id;
        let outcome = self.log.append(message);
        let record = match outcome {
            Merge::Unchanged => return None,
            Merge::Inserted | Merge::Updated => self.log.get(id).cloned()?,
        };
        if outcome == Merge::Inserted {
            self.count_unread(&record);
        }
        Some(record)
    }

    fn count_unread(&mut self, record: &Message) {
        let Some(active) = self.session.identity() else {
            return;
        };
        if record.is_hidden_from(active) {
            return;
        }
        if self.unread.record(active, record) {
            debug!(
                "Unread from {} for {} is now {}",
                record.from,
                active,
                self.unread.count(&record.from)
            );
        }
    }
}
