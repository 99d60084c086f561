//! Command dispatch: one request envelope in, exactly one response
//! envelope out.
//!
//! The dispatcher exclusively owns the store, the snapshot file and
//! the fan-out sink; it runs on a single task, so handlers mutate
//! state without any locking. Handlers signal failure through
//! [`CommandError`] and the boundary in [`Dispatcher::handle_line`]
//! converts any error into the generic error envelope — the transport
//! requires strict request/response alternation, so a request must
//! never go unanswered.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use parley_wire::{
    status, ChannelData, DirectData, Envelope, LoginData, PublishData, StampData,
};

use crate::bridge::FanoutSink;
use crate::models::{DirectMessage, Publication};
use crate::store::{SnapshotFile, Store};

/// Failure modes a handler can signal. All of them become a normal
/// error response; none of them terminate the server.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Missing or blank required input.
    #[error("{0}")]
    Validation(String),
    /// The request conflicts with existing state.
    #[error("{0}")]
    Conflict(String),
    /// The payload object does not match the command's shape.
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// No handler for this service name.
    #[error("Unknown service: {0}")]
    UnknownService(String),
}

pub struct Dispatcher {
    store: Store,
    snapshot_file: SnapshotFile,
    fanout: Box<dyn FanoutSink>,
}

impl Dispatcher {
    pub fn new(store: Store, snapshot_file: SnapshotFile, fanout: Box<dyn FanoutSink>) -> Self {
        Self {
            store,
            snapshot_file,
            fanout,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Process one request line and return the encoded response line.
    pub async fn handle_line(&mut self, line: &str) -> String {
        let response = match Envelope::from_line(line) {
            Ok(request) => {
                info!(service = %request.service, "received request");
                let service = request.service.clone();
                match self.dispatch(request).await {
                    Ok(response) => response,
                    Err(e) => Envelope::error(service, e.to_string(), now()),
                }
            }
            Err(e) => Envelope::error("parse_error", format!("Invalid JSON: {e}"), now()),
        };
        response.to_line()
    }

    async fn dispatch(&mut self, request: Envelope) -> Result<Envelope, CommandError> {
        match request.service.as_str() {
            "login" => self.login(decode(request.data)?).await,
            "users" => self.list_users(decode(request.data)?),
            "channel" => self.create_channel(decode(request.data)?).await,
            "channels" => self.list_channels(decode(request.data)?),
            "publish" => Ok(self.publish(decode(request.data)?).await),
            "message" => Ok(self.direct_message(decode(request.data)?).await),
            other => Err(CommandError::UnknownService(other.to_string())),
        }
    }

    async fn login(&mut self, data: LoginData) -> Result<Envelope, CommandError> {
        if data.user.trim().is_empty() {
            return Err(CommandError::Validation("Username is required".to_string()));
        }

        if self.store.upsert_user(&data.user, data.timestamp) {
            info!(user = %data.user, "new user registered");
        } else {
            info!(user = %data.user, "user logged in again");
        }
        self.checkpoint().await;

        Ok(Envelope::new(
            "login",
            json!({ "status": status::SUCCESS, "timestamp": now() }),
        ))
    }

    fn list_users(&self, _data: StampData) -> Result<Envelope, CommandError> {
        let users = self.store.list_usernames();
        debug!(count = users.len(), "returning user list");
        Ok(Envelope::new(
            "users",
            json!({ "timestamp": now(), "users": users }),
        ))
    }

    async fn create_channel(&mut self, data: ChannelData) -> Result<Envelope, CommandError> {
        if data.channel.trim().is_empty() {
            return Err(CommandError::Validation(
                "Channel name is required".to_string(),
            ));
        }

        // Unlike login, duplicate creation is an explicit conflict.
        if !self.store.insert_channel_if_absent(&data.channel, data.timestamp) {
            return Err(CommandError::Conflict("Channel already exists".to_string()));
        }

        info!(channel = %data.channel, "new channel created");
        self.checkpoint().await;

        Ok(Envelope::new(
            "channel",
            json!({ "status": status::SUCCESS, "timestamp": now() }),
        ))
    }

    fn list_channels(&self, _data: StampData) -> Result<Envelope, CommandError> {
        let channels = self.store.list_channel_names();
        debug!(count = channels.len(), "returning channel list");
        Ok(Envelope::new(
            "channels",
            json!({ "timestamp": now(), "channels": channels }),
        ))
    }

    /// Append a channel publication and forward it to the relay.
    ///
    /// The channel must already exist; the author is deliberately not
    /// checked against the user registry. A relay failure is reported
    /// to the caller, but the already-persisted publication stands.
    async fn publish(&mut self, data: PublishData) -> Envelope {
        if self.store.find_channel(&data.channel).is_none() {
            return delivery_error(
                "publish",
                format!("Channel '{}' does not exist", data.channel),
            );
        }

        self.store.append_publication(Publication {
            user: data.user.clone(),
            channel: data.channel.clone(),
            message: data.message.clone(),
            timestamp: data.timestamp,
        });
        self.checkpoint().await;

        let payload = json!({
            "user": data.user,
            "message": data.message,
            "timestamp": data.timestamp,
        });
        match self.fanout.send(&data.channel, payload).await {
            Ok(()) => {
                info!(channel = %data.channel, user = %data.user, "publication forwarded");
                delivered("publish")
            }
            Err(e) => {
                warn!(channel = %data.channel, "fan-out send failed: {e}");
                delivery_error("publish", format!("Failed to publish: {e}"))
            }
        }
    }

    /// Append a direct message and forward it on the recipient's
    /// topic. The recipient must be a registered user; the sender is
    /// deliberately not validated.
    async fn direct_message(&mut self, data: DirectData) -> Envelope {
        if self.store.find_user(&data.dst).is_none() {
            return delivery_error("message", format!("User '{}' does not exist", data.dst));
        }

        self.store.append_direct_message(DirectMessage {
            src: data.src.clone(),
            dst: data.dst.clone(),
            message: data.message.clone(),
            timestamp: data.timestamp,
        });
        self.checkpoint().await;

        let payload = json!({
            "src": data.src,
            "message": data.message,
            "timestamp": data.timestamp,
        });
        match self.fanout.send(&data.dst, payload).await {
            Ok(()) => {
                info!(src = %data.src, dst = %data.dst, "direct message forwarded");
                delivered("message")
            }
            Err(e) => {
                warn!(dst = %data.dst, "fan-out send failed: {e}");
                delivery_error("message", format!("Failed to send message: {e}"))
            }
        }
    }

    /// Write the current state to the snapshot file. Fire-and-forget
    /// from the client's point of view: a write failure is logged and
    /// the response goes out as if nothing happened.
    async fn checkpoint(&self) {
        let snapshot = self.store.snapshot(now());
        if let Err(e) = self.snapshot_file.save(&snapshot).await {
            warn!("failed to save snapshot: {e}");
        } else {
            debug!(
                users = snapshot.users.len(),
                channels = snapshot.channels.len(),
                publications = snapshot.publications.len(),
                messages = snapshot.messages.len(),
                "snapshot saved"
            );
        }
    }

    /// Final save on graceful shutdown.
    pub async fn save_on_shutdown(&self) {
        let snapshot = self.store.snapshot(now());
        match self.snapshot_file.save(&snapshot).await {
            Ok(()) => info!(
                users = snapshot.users.len(),
                channels = snapshot.channels.len(),
                publications = snapshot.publications.len(),
                messages = snapshot.messages.len(),
                "final snapshot saved"
            ),
            Err(e) => warn!("failed to save final snapshot: {e}"),
        }
    }
}

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, CommandError> {
    Ok(serde_json::from_value(data)?)
}

fn now() -> i64 {
    Utc::now().timestamp_millis()
}

/// `publish`/`message` failure shape: `status: "erro"` with the
/// detail under `message` rather than `description`.
fn delivery_error(service: &str, detail: String) -> Envelope {
    Envelope::new(
        service,
        json!({ "status": status::ERROR, "message": detail, "timestamp": now() }),
    )
}

fn delivered(service: &str) -> Envelope {
    Envelope::new(
        service,
        json!({ "status": status::DELIVERED, "timestamp": now() }),
    )
}
