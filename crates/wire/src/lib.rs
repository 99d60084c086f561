//! Wire types for the Parley chat protocol.
//!
//! Both endpoints speak newline-delimited JSON. The command endpoint
//! exchanges [`Envelope`] values (one request line in, exactly one
//! response line out); the fan-out path carries [`FanoutFrame`] lines
//! from the server toward the broadcast relay.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status vocabulary used in response payloads. These are historic
/// wire constants shared with existing clients and must not change.
pub mod status {
    /// Success marker for `login` and `channel`.
    pub const SUCCESS: &str = "sucesso";
    /// Error marker for every failing command.
    pub const ERROR: &str = "erro";
    /// Delivery success marker for `publish` and `message`.
    pub const DELIVERED: &str = "OK";
}

/// The request/response envelope: a command name plus a
/// command-specific payload object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub service: String,
    pub data: Value,
}

impl Envelope {
    pub fn new(service: impl Into<String>, data: Value) -> Self {
        Self {
            service: service.into(),
            data,
        }
    }

    /// Parse one request line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Encode as a single response line (no trailing newline).
    ///
    /// An envelope of `String` + `Value` cannot fail to serialize in
    /// practice; the fallback keeps the request/response alternation
    /// intact even if it somehow does.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"service":"server_error","data":{"status":"erro"}}"#.to_string()
        })
    }

    /// The generic error response shape: `status: "erro"` plus a
    /// human-readable `description`, under the offending service name.
    pub fn error(service: impl Into<String>, description: impl Into<String>, timestamp: i64) -> Self {
        Self::new(
            service,
            serde_json::json!({
                "status": status::ERROR,
                "timestamp": timestamp,
                "description": description.into(),
            }),
        )
    }
}

/// `login` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub user: String,
    pub timestamp: i64,
}

/// `users` / `channels` request payload: just the client clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampData {
    pub timestamp: i64,
}

/// `channel` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelData {
    pub channel: String,
    pub timestamp: i64,
}

/// `publish` request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishData {
    pub user: String,
    pub channel: String,
    pub message: String,
    pub timestamp: i64,
}

/// `message` (direct message) request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectData {
    pub src: String,
    pub dst: String,
    pub message: String,
    pub timestamp: i64,
}

/// One fan-out line: a routing topic (channel name or destination
/// username) followed by the JSON payload. The topic prefix lets
/// subscribers filter frames without parsing the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FanoutFrame {
    pub topic: String,
    pub payload: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame has no payload after topic")]
    MissingPayload,
    #[error("invalid frame payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl FanoutFrame {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Encode as `<topic> <json>` (no trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{} {}",
            self.topic,
            serde_json::to_string(&self.payload).unwrap_or_else(|_| "{}".to_string())
        )
    }

    /// Parse a `<topic> <json>` line, the inverse of [`to_line`].
    ///
    /// [`to_line`]: FanoutFrame::to_line
    pub fn from_line(line: &str) -> Result<Self, FrameError> {
        let (topic, rest) = line.split_once(' ').ok_or(FrameError::MissingPayload)?;
        Ok(Self {
            topic: topic.to_string(),
            payload: serde_json::from_str(rest)?,
        })
    }
}
