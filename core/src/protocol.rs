//! Wire-level types exchanged with the Chat Gateway.
//!
//! The core only ever reads a [`ChatMessage`]; it never mutates one that the
//! gateway handed over. Outbound requests carry an [`OutgoingContent`].

use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Opaque identifier of a single chat event.
    EventId
}

string_id! {
    /// Opaque identifier of a chat room.
    RoomId
}

string_id! {
    /// Opaque identifier of a chat participant.
    UserId
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Notice,
    /// "/me does something" style action.
    Emote,
}

/// A message as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub event_id: EventId,
    pub room_id: RoomId,
    pub sender: UserId,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub kind: MessageKind,
    /// Event this message explicitly replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<EventId>,
    /// Set on edit events: the event whose content this one replaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_of: Option<EventId>,
}

impl ChatMessage {
    pub fn is_emote(&self) -> bool {
        self.kind == MessageKind::Emote
    }
}

/// Events flowing from the gateway into the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    Message(ChatMessage),
    /// New content for an earlier message; `edit_of` names the original.
    Edit(ChatMessage),
    Redaction { room_id: RoomId, redacts: EventId },
}

/// Content of a message the core asks the gateway to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingContent {
    pub kind: MessageKind,
    pub body: String,
    /// HTML rendition of `body`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

impl OutgoingContent {
    pub fn notice(body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Notice,
            body: body.into(),
            formatted_body: None,
        }
    }

    pub fn html_notice(body: impl Into<String>, formatted_body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Notice,
            body: body.into(),
            formatted_body: Some(formatted_body.into()),
        }
    }
}
