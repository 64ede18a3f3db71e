use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipient value meaning "every participant".
pub const BROADCAST: &str = "Todos";

/// Status text appended when a participant registers.
pub const JOIN_TEXT: &str = "entra na sala...";

/// Status text appended when the sweeper evicts a participant.
pub const LEAVE_TEXT: &str = "sai da sala...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Public chat line.
    Message,
    /// Chat line addressed to a single participant.
    PrivateMessage,
    /// Join/leave notice generated by the server.
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::PrivateMessage => "private_message",
            Self::Status => "status",
        }
    }

    /// Kinds a participant may post or switch a message to. `Status` is
    /// reserved for the server.
    pub fn is_user_postable(&self) -> bool {
        matches!(self, Self::Message | Self::PrivateMessage)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message type '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "private_message" => Ok(Self::PrivateMessage),
            "status" => Ok(Self::Status),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A live chat identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    /// Milliseconds since the Unix epoch of the last heartbeat (or registration).
    pub last_status: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Server local time of creation, `HH:MM:SS`.
    pub time: String,
}

impl Message {
    /// Whether `viewer` may see this message when polling.
    pub fn visible_to(&self, viewer: &str) -> bool {
        self.to == BROADCAST || self.to == viewer || self.from == viewer
    }
}
