use std::collections::HashSet;

use tabchat_types::User;

/// Known users, in the order this context learned about them.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    users: Vec<User>,
    names: HashSet<String>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user` unless the username is already known. Returns `true` if added.
    pub fn register(&mut self, user: User) -> bool {
        if !self.names.insert(user.username.clone()) {
            return false;
        }
        self.users.push(user);
        true
    }

    pub fn contains(&self, username: &str) -> bool {
        self.names.contains(username)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Everyone except `identity`.
    pub fn peers_of<'a>(&'a self, identity: &'a str) -> impl Iterator<Item = &'a User> + 'a {
        self.users.iter().filter(move |u| u.username != identity)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_keyed_by_exact_username() {
        let mut dir = Directory::new();
        assert!(dir.register(User::new("alice")));
        assert!(!dir.register(User::new("alice")));
        assert!(dir.register(User::new("Alice")));
        assert_eq!(dir.len(), 2);
        assert!(dir.contains("alice"));
        assert!(!dir.contains("bob"));
    }

    #[test]
    fn peers_exclude_self_and_keep_order() {
        let mut dir = Directory::new();
        for name in ["carol", "alice", "bob"] {
            dir.register(User::new(name));
        }

        let peers: Vec<&str> = dir.peers_of("alice").map(|u| u.username.as_str()).collect();
        assert_eq!(peers, vec!["carol", "bob"]);
    }
}
