use serde::{Deserialize, Serialize};

/// A registered user. Created on first `login`; `last_login` is
/// refreshed on every subsequent login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user: String,
    pub created_at: i64,
    pub last_login: i64,
}

impl User {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user: name.into(),
            created_at: timestamp,
            last_login: timestamp,
        }
    }
}

/// A chat channel. Creation is one-shot; channels are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub channel: String,
    pub created_at: i64,
}

impl Channel {
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            channel: name.into(),
            created_at: timestamp,
        }
    }
}

/// One entry in the append-only channel publication log. The author
/// is recorded as sent, without a registry check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub user: String,
    pub channel: String,
    pub message: String,
    pub timestamp: i64,
}

/// One entry in the append-only direct-message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    pub src: String,
    pub dst: String,
    pub message: String,
    pub timestamp: i64,
}

/// The complete persisted state: the four registries plus a
/// last-updated marker. Nothing exists outside this snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub publications: Vec<Publication>,
    #[serde(default)]
    pub messages: Vec<DirectMessage>,
    #[serde(default)]
    pub last_updated: i64,
}
