use thiserror::Error;

/// Errors surfaced to the caller of the chat API.
///
/// Storage and channel failures never show up here: they are logged where
/// they happen and the operation carries on with the local state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("username '{0}' is already registered")]
    DuplicateUser(String),

    #[error("no user is logged in")]
    NotLoggedIn,

    #[error("invalid username {0:?}")]
    InvalidUsername(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

/// Usernames must contain at least one non-whitespace character.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(ChatError::InvalidUsername(username.to_string()));
    }
    Ok(())
}
