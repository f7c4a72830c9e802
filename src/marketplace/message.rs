use std::fmt;

use serde::{Deserialize, Serialize};

use crate::marketplace::ids::{ConversationId, MessageId, UserId};

/// Sentinel sender id used for engine-generated messages.
pub const SYSTEM_SENDER: &str = "system";

/// Who authored a message.
///
/// Serialized as the participant's id, or the `"system"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sender {
    Participant(UserId),
    /// The negotiation engine itself, announcing a transition.
    System,
}

impl Sender {
    pub fn as_participant(&self) -> Option<&UserId> {
        match self {
            Self::Participant(user) => Some(user),
            Self::System => None,
        }
    }
}

impl From<String> for Sender {
    fn from(raw: String) -> Self {
        if raw == SYSTEM_SENDER {
            Self::System
        } else {
            Self::Participant(UserId::new(raw))
        }
    }
}

impl From<Sender> for String {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::System => SYSTEM_SENDER.to_string(),
            Sender::Participant(user) => user.to_string(),
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str(SYSTEM_SENDER),
            Self::Participant(user) => user.fmt(f),
        }
    }
}

/// Message category. System messages are produced exclusively by engine
/// transitions, never by direct user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,

    pub conversation_id: ConversationId,

    pub sender: Sender,

    pub body: String,

    /// Server-assigned timestamp; strictly increasing within a conversation
    /// so ordering never depends on client clocks.
    pub created_at: u64,

    pub kind: MessageKind,
}

impl Message {
    pub const fn is_system(&self) -> bool {
        matches!(self.kind, MessageKind::System)
    }
}
