//! Chat state shared between the contexts ("tabs") of one origin.
//!
//! Every context owns a [`ChatContext`]: its own storage connection, its own
//! channel subscriptions and its own in-memory [`ChatState`]. Writes go to the
//! local state first, then to storage, then out on the broadcast channel.
//! Sibling contexts merge what they receive by message id.

pub mod config;
pub mod context;
pub mod directory;
pub mod error;
pub mod message_log;
pub mod origin;
pub mod session;
pub mod state;
pub mod unread;

pub use config::OriginConfig;
pub use context::ChatContext;
pub use error::ChatError;
pub use message_log::{Merge, MessageLog};
pub use origin::Origin;
pub use session::Session;
pub use state::{ChatEvent, ChatState};

pub use tabchat_types::{Message, Perspective, User};
