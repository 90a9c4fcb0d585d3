//! The seam between the substitution core and the chat transport.
//!
//! Implementations own delivery, authentication and room membership; the
//! core only issues the requests below and never holds a lock while one of
//! them is in flight.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::protocol::ChatMessage;
use crate::protocol::EventId;
use crate::protocol::OutgoingContent;
use crate::protocol::RoomId;
use crate::protocol::UserId;

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Send `content` as a reply to `in_reply_to`, returning the id of the
    /// new event.
    async fn send_reply(
        &self,
        room_id: &RoomId,
        in_reply_to: &EventId,
        content: OutgoingContent,
    ) -> Result<EventId, GatewayError>;

    /// Replace the content of an event previously sent by us.
    async fn send_edit(
        &self,
        room_id: &RoomId,
        replaces: &EventId,
        content: OutgoingContent,
    ) -> Result<EventId, GatewayError>;

    async fn send_redaction(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
    ) -> Result<(), GatewayError>;

    async fn fetch_event(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
    ) -> Result<ChatMessage, GatewayError>;

    async fn fetch_display_name(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<String, GatewayError>;

    async fn mark_read(&self, room_id: &RoomId, event_id: &EventId) -> Result<(), GatewayError>;
}
