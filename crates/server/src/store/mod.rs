//! Authoritative in-memory registries for users, channels,
//! publications and direct messages.
//!
//! The store is a plain owned value with no interior locking: every
//! mutation happens on the single dispatcher task, so exclusive
//! ownership is the whole concurrency story. Lookups are linear scans
//! by name; insertion order is preserved and is the listing order.

pub mod snapshot;

pub use snapshot::SnapshotFile;

use crate::models::{Channel, DirectMessage, Publication, Snapshot, User};

#[derive(Debug, Default)]
pub struct Store {
    users: Vec<User>,
    channels: Vec<Channel>,
    publications: Vec<Publication>,
    messages: Vec<DirectMessage>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            users: snapshot.users,
            channels: snapshot.channels,
            publications: snapshot.publications,
            messages: snapshot.messages,
        }
    }

    /// Full-state projection handed to persistence. `last_updated`
    /// is stamped by the caller at save time.
    pub fn snapshot(&self, last_updated: i64) -> Snapshot {
        Snapshot {
            users: self.users.clone(),
            channels: self.channels.clone(),
            publications: self.publications.clone(),
            messages: self.messages.clone(),
            last_updated,
        }
    }

    pub fn find_user(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.user == name)
    }

    /// Insert a new user or refresh `last_login` on an existing one.
    /// Returns `true` when the user was newly registered.
    pub fn upsert_user(&mut self, name: &str, timestamp: i64) -> bool {
        match self.users.iter_mut().find(|u| u.user == name) {
            Some(existing) => {
                existing.last_login = timestamp;
                false
            }
            None => {
                self.users.push(User::new(name, timestamp));
                true
            }
        }
    }

    pub fn list_usernames(&self) -> Vec<String> {
        self.users.iter().map(|u| u.user.clone()).collect()
    }

    pub fn find_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.channel == name)
    }

    /// Create a channel unless one with the same name exists.
    /// Returns `true` when inserted.
    pub fn insert_channel_if_absent(&mut self, name: &str, timestamp: i64) -> bool {
        if self.find_channel(name).is_some() {
            return false;
        }
        self.channels.push(Channel::new(name, timestamp));
        true
    }

    pub fn list_channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.channel.clone()).collect()
    }

    pub fn append_publication(&mut self, publication: Publication) {
        self.publications.push(publication);
    }

    pub fn append_direct_message(&mut self, message: DirectMessage) {
        self.messages.push(message);
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn publication_count(&self) -> usize {
        self.publications.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_user_is_idempotent_on_name() {
        let mut store = Store::new();
        assert!(store.upsert_user("alice", 100));
        assert!(!store.upsert_user("alice", 200));

        assert_eq!(store.user_count(), 1);
        let alice = store.find_user("alice").unwrap();
        assert_eq!(alice.created_at, 100);
        assert_eq!(alice.last_login, 200);
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let mut store = Store::new();
        assert!(store.insert_channel_if_absent("general", 100));
        assert!(!store.insert_channel_if_absent("general", 200));

        assert_eq!(store.channel_count(), 1);
        assert_eq!(store.find_channel("general").unwrap().created_at, 100);
    }

    #[test]
    fn listings_preserve_insertion_order() {
        let mut store = Store::new();
        store.upsert_user("carol", 1);
        store.upsert_user("alice", 2);
        store.upsert_user("bob", 3);
        store.insert_channel_if_absent("zeta", 4);
        store.insert_channel_if_absent("alpha", 5);

        assert_eq!(store.list_usernames(), vec!["carol", "alice", "bob"]);
        assert_eq!(store.list_channel_names(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn empty_store_lists_nothing() {
        let store = Store::new();
        assert!(store.list_usernames().is_empty());
        assert!(store.list_channel_names().is_empty());
    }

    #[test]
    fn snapshot_round_trips_through_store() {
        let mut store = Store::new();
        store.upsert_user("alice", 100);
        store.insert_channel_if_absent("general", 101);
        store.append_publication(Publication {
            user: "alice".into(),
            channel: "general".into(),
            message: "hi".into(),
            timestamp: 102,
        });

        let restored = Store::from_snapshot(store.snapshot(103));
        assert_eq!(restored.list_usernames(), vec!["alice"]);
        assert_eq!(restored.list_channel_names(), vec!["general"]);
        assert_eq!(restored.publication_count(), 1);
    }
}
