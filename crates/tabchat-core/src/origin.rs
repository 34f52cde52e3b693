use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tabchat_db::Database;
use tabchat_sync::{MessageDispatcher, UserDispatcher};

use crate::config::OriginConfig;
use crate::context::ChatContext;

/// The storage file and broadcast hub shared by every context of one origin.
#[derive(Clone)]
pub struct Origin {
    config: Arc<OriginConfig>,
    messages: MessageDispatcher,
    users: UserDispatcher,
}

impl Origin {
    pub fn open(config: OriginConfig) -> Self {
        let messages = MessageDispatcher::new(config.channel_capacity);
        let users = UserDispatcher::new(config.channel_capacity);
        Self {
            config: Arc::new(config),
            messages,
            users,
        }
    }

    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    /// Open a new context with its own connection to the origin's storage.
    /// It starts logged out, holding whatever storage held at this moment.
    pub fn open_context(&self) -> Result<ChatContext> {
        let db = Database::open(&self.config.db_path)?;
        let context = ChatContext::new(
            db,
            self.messages.channel(&self.config.message_channel),
            self.users.channel(&self.config.user_channel),
        );
        info!(
            "Context {} opened, {} live on {}",
            context.id(),
            self.live_contexts(),
            self.config.message_channel
        );
        Ok(context)
    }

    /// Contexts currently subscribed to message notifications.
    pub fn live_contexts(&self) -> usize {
        self.messages.subscriber_count(&self.config.message_channel)
    }
}
