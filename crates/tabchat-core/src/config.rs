use std::path::PathBuf;

use tracing::warn;

use tabchat_sync::{MESSAGE_CHANNEL, USER_CHANNEL};

const DEFAULT_DB_PATH: &str = "tabchat.db";
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Where an origin keeps its storage and what its channels are called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginConfig {
    pub db_path: PathBuf,
    pub message_channel: String,
    pub user_channel: String,
    pub channel_capacity: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            message_channel: MESSAGE_CHANNEL.to_string(),
            user_channel: USER_CHANNEL.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl OriginConfig {
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `TABCHAT_DB_PATH` and `TABCHAT_CHANNEL_CAPACITY`.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = var("TABCHAT_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(raw) = var("TABCHAT_CHANNEL_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.channel_capacity = n,
                _ => warn!(
                    "Ignoring TABCHAT_CHANNEL_CAPACITY={:?}, using {}",
                    raw, DEFAULT_CHANNEL_CAPACITY
                ),
            }
        }

        config
    }
}
