pub mod dispatcher;

pub use dispatcher::{BroadcastChannel, Dispatcher, Envelope, Subscription};

use tabchat_types::events::{MessageEvent, UserEvent};

/// Default name of the channel carrying message notifications.
pub const MESSAGE_CHANNEL: &str = "message-update";

/// Default name of the channel carrying directory notifications.
pub const USER_CHANNEL: &str = "user-update";

pub type MessageDispatcher = Dispatcher<MessageEvent>;
pub type UserDispatcher = Dispatcher<UserEvent>;
