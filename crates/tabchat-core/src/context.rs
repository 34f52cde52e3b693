use std::collections::HashMap;
use std::slice;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tabchat_db::{Database, Table};
use tabchat_sync::{BroadcastChannel, Subscription};
use tabchat_types::events::{MessageEvent, UserEvent};
use tabchat_types::{Message, User};

use crate::error::{ChatError, Result, validate_username};
use crate::state::{ChatEvent, ChatState};

enum Incoming {
    Message(MessageEvent),
    User(UserEvent),
}

/// One context ("tab") of an origin.
///
/// Writes are applied locally, committed to storage, then announced to the
/// other contexts. Notifications from other contexts are only applied when
/// the owner calls [`poll_sync`](Self::poll_sync) or
/// [`sync_next`](Self::sync_next).
pub struct ChatContext {
    id: Uuid,
    db: Database,
    message_channel: BroadcastChannel<MessageEvent>,
    message_rx: Subscription<MessageEvent>,
    user_channel: BroadcastChannel<UserEvent>,
    user_rx: Subscription<UserEvent>,
    state: ChatState,
}

impl ChatContext {
    /// Subscribe to both channels, then load storage. Anything committed after
    /// the subscription arrives as a notification; anything before is in the
    /// snapshot, and overlap is absorbed by id.
    pub fn new(
        db: Database,
        message_channel: BroadcastChannel<MessageEvent>,
        user_channel: BroadcastChannel<UserEvent>,
    ) -> Self {
        let id = Uuid::new_v4();
        let message_rx = message_channel.subscribe(id);
        let user_rx = user_channel.subscribe(id);

        let mut context = Self {
            id,
            db,
            message_channel,
            message_rx,
            user_channel,
            user_rx,
            state: ChatState::new(),
        };
        context.refresh();
        context
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn active_identity(&self) -> Option<&str> {
        self.state.session().identity()
    }

    pub fn selected_peer(&self) -> Option<&str> {
        self.state.session().peer()
    }

    pub fn users(&self) -> &[User] {
        self.state.directory().users()
    }

    /// Known users other than the active identity.
    pub fn peers(&self) -> Vec<&User> {
        match self.active_identity() {
            Some(identity) => self.state.directory().peers_of(identity).collect(),
            None => self.users().iter().collect(),
        }
    }

    // -- Session --

    /// Start a session as `identity`. Storage is re-read first so the new
    /// session starts from everything committed so far.
    pub fn login(&mut self, identity: &str) -> Result<()> {
        validate_username(identity)?;
        self.refresh();
        self.state.reduce(ChatEvent::Login(identity.to_string()))?;

        if !self.state.directory().contains(identity) {
            debug!("{} logged in without a directory entry", identity);
        }
        info!("Context {} logged in as {}", self.id, identity);
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(identity) = self.active_identity() {
            info!("Context {} logged out {}", self.id, identity);
        }
        self.apply(ChatEvent::Logout);
    }

    /// Open the conversation with `peer`, marking everything from them read.
    pub fn select_conversation(&mut self, peer: &str) -> Result<()> {
        self.state.reduce(ChatEvent::Select(peer.to_string()))?;
        Ok(())
    }

    // -- Writes --

    /// Add `user` to the directory. Fails if storage already has the username.
    pub fn register_user(&mut self, user: User) -> Result<()> {
        validate_username(&user.username)?;

        let durable: Vec<User> = self.db.load(Table::Users).unwrap_or_else(|e| {
            error!("Failed to read users before registering {}: {}", user.username, e);
            Vec::new()
        });
        if durable.iter().any(|u| u.username == user.username) {
            self.apply(ChatEvent::Register(user.clone()));
            return Err(ChatError::DuplicateUser(user.username));
        }

        if let Err(e) = self.db.append(Table::Users, slice::from_ref(&user)) {
            error!("Failed to persist user {}: {}", user.username, e);
        }
        self.apply(ChatEvent::Register(user.clone()));
        self.user_channel
            .publish(self.id, UserEvent::UserRegistered { user: user.clone() });

        info!("Registered {}", user.username);
        Ok(())
    }

    /// Create, store and announce a message. Recipients missing from the
    /// directory get it anyway.
    pub fn send_message(&mut self, from: &str, to: &str, body: &str) -> Message {
        let message = Message::new(from, to, body);

        if !self.state.directory().contains(to) {
            debug!("Recipient {} is not in the directory", to);
        }

        let message_list = self.state.log().snapshot();
        self.apply(ChatEvent::Append(message.clone()));

        if let Err(e) = self.db.append(Table::Messages, slice::from_ref(&message)) {
            error!("Failed to persist message {}: {}", message.id, e);
        }

        self.message_channel.publish(
            self.id,
            MessageEvent::MessageCreate {
                message: message.clone(),
                message_list,
            },
        );

        debug!("{} -> {}: message {} sent", from, to, message.id);
        message
    }

    /// Hide the conversation with `peer` from the active identity only.
    /// Returns how many records were newly hidden.
    pub fn clear_conversation(&mut self, peer: &str) -> Result<usize> {
        let changed = self.state.reduce(ChatEvent::Clear(peer.to_string()))?;
        if changed.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.db.append(Table::Messages, &changed) {
            error!("Failed to persist cleared conversation with {}: {}", peer, e);
        }

        let count = changed.len();
        self.message_channel
            .publish(self.id, MessageEvent::MessagesCleared { messages: changed });

        info!("Cleared {} message(s) with {}", count, peer);
        Ok(count)
    }

    // -- Reads --

    /// The active identity's view of its conversation with `peer`.
    pub fn get_visible_messages<'a>(
        &'a self,
        peer: &'a str,
    ) -> Result<impl Iterator<Item = &'a Message> + 'a> {
        let identity = self.active_identity().ok_or(ChatError::NotLoggedIn)?;
        Ok(self.state.log().visible_to(identity, peer))
    }

    /// Unread counts by sender. Senders with nothing unread are absent.
    pub fn get_unread_counts(&self) -> HashMap<String, usize> {
        self.state.unread().counts().clone()
    }

    // -- Sync --

    /// Apply every notification already waiting. Returns how many there were.
    pub fn poll_sync(&mut self) -> usize {
        let mut applied = 0;

        // Users first, so senders are known by the time their messages land
        while let Some(event) = self.user_rx.try_next() {
            self.handle(Incoming::User(event));
            applied += 1;
        }
        while let Some(event) = self.message_rx.try_next() {
            self.handle(Incoming::Message(event));
            applied += 1;
        }

        self.recover_missed();
        applied
    }

    /// Wait for the next notification and apply it. Returns `false` once
    /// both channels are closed.
    pub async fn sync_next(&mut self) -> bool {
        let incoming = tokio::select! {
            Some(event) = self.user_rx.next() => Incoming::User(event),
            Some(event) = self.message_rx.next() => Incoming::Message(event),
            else => return false,
        };

        self.handle(incoming);
        self.recover_missed();
        true
    }

    /// Merge the current storage snapshots into the local state.
    pub fn refresh(&mut self) {
        match self.db.load::<User>(Table::Users) {
            Ok(users) => {
                for user in users {
                    self.apply(ChatEvent::Register(user));
                }
            }
            Err(e) => error!("Failed to load users: {}", e),
        }

        match self.db.load::<Message>(Table::Messages) {
            Ok(messages) => {
                let merged = self.apply(ChatEvent::Hint(messages));
                if !merged.is_empty() {
                    debug!("Context {} picked up {} record(s) from storage", self.id, merged.len());
                }
            }
            Err(e) => error!("Failed to load messages: {}", e),
        }
    }

    fn handle(&mut self, incoming: Incoming) {
        match incoming {
            Incoming::User(UserEvent::UserRegistered { user }) => {
                self.apply(ChatEvent::Register(user));
            }
            Incoming::Message(MessageEvent::MessageCreate {
                message,
                message_list,
            }) => {
                debug!("Context {} received message {} from {}", self.id, message.id, message.from);
                // Announced record first; the list fills any gaps this context missed
                self.apply(ChatEvent::Receive(message));
                self.apply(ChatEvent::Hint(message_list));
            }
            Incoming::Message(MessageEvent::MessagesCleared { messages }) => {
                self.apply(ChatEvent::Hint(messages));
            }
        }
    }

    /// A lagged subscription skipped notifications; storage has them.
    fn recover_missed(&mut self) {
        let missed = self.user_rx.take_missed() + self.message_rx.take_missed();
        if missed > 0 {
            warn!("Context {} missed {} notification(s), re-reading storage", self.id, missed);
            self.refresh();
        }
    }

    /// Reduce an event that cannot fail for a context-internal reason.
    fn apply(&mut self, event: ChatEvent) -> Vec<Message> {
        self.state.reduce(event).unwrap_or_else(|e| {
            warn!("Context {} dropped event: {}", self.id, e);
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabchat_sync::{MessageDispatcher, UserDispatcher};

    fn in_memory_pair() -> (ChatContext, ChatContext) {
        let messages = MessageDispatcher::new(16);
        let users = UserDispatcher::new(16);
        let open = || {
            ChatContext::new(
                Database::open_in_memory().unwrap(),
                messages.channel("message-update"),
                users.channel("user-update"),
            )
        };
        (open(), open())
    }

    #[test]
    fn broadcast_alone_is_enough_to_converge() {
        // Separate in-memory databases: nothing is shared but the channels
        let (mut alice, mut bob) = in_memory_pair();
        alice.register_user(User::new("alice")).unwrap();
        bob.register_user(User::new("bob")).unwrap();
        alice.login("alice").unwrap();
        bob.login("bob").unwrap();

        let sent = alice.send_message("alice", "bob", "hi");
        assert_eq!(bob.poll_sync(), 2);

        let view: Vec<&Message> = bob.get_visible_messages("alice").unwrap().collect();
        assert_eq!(view, vec![&sent]);
        assert_eq!(bob.users().len(), 2);
        assert_eq!(alice.poll_sync(), 1);
        assert_eq!(alice.peers(), vec![&User::new("bob")]);
    }

    #[test]
    fn reads_need_a_session() {
        let (alice, _) = in_memory_pair();
        assert_eq!(
            alice.get_visible_messages("bob").err(),
            Some(ChatError::NotLoggedIn)
        );
    }

    #[test]
    fn clearing_nothing_publishes_nothing() {
        let (mut alice, mut bob) = in_memory_pair();
        alice.login("alice").unwrap();
        assert_eq!(alice.clear_conversation("bob").unwrap(), 0);
        assert_eq!(bob.poll_sync(), 0);
    }
}
