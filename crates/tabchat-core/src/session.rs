/// Per-context login state. Never persisted.
///
/// `LoggedOut -> LoggedIn -> ChatSelected -> LoggedOut`; selecting another
/// peer re-enters `ChatSelected`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    LoggedOut,
    LoggedIn {
        identity: String,
    },
    ChatSelected {
        identity: String,
        peer: String,
    },
}

impl Session {
    pub fn logged_in(identity: impl Into<String>) -> Self {
        Self::LoggedIn {
            identity: identity.into(),
        }
    }

    /// The active identity, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::LoggedOut => None,
            Self::LoggedIn { identity } | Self::ChatSelected { identity, .. } => {
                Some(identity.as_str())
            }
        }
    }

    /// The selected peer, if a conversation is open.
    pub fn peer(&self) -> Option<&str> {
        match self {
            Self::ChatSelected { peer, .. } => Some(peer.as_str()),
            _ => None,
        }
    }

    /// The session after opening the conversation with `peer`, or `None`
    /// when logged out.
    pub fn select(&self, peer: impl Into<String>) -> Option<Self> {
        self.identity().map(|identity| Self::ChatSelected {
            identity: identity.to_string(),
            peer: peer.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        let session = Session::default();
        assert_eq!(session.identity(), None);
        assert!(session.select("bob").is_none());

        let session = Session::logged_in("alice");
        assert_eq!(session.identity(), Some("alice"));
        assert_eq!(session.peer(), None);

        let session = session.select("bob").unwrap();
        assert_eq!(session.identity(), Some("alice"));
        assert_eq!(session.peer(), Some("bob"));

        let session = session.select("carol").unwrap();
        assert_eq!(session.peer(), Some("carol"));
    }
}
