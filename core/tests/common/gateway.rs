use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use sedbot_core::error::GatewayError;
use sedbot_core::gateway::ChatGateway;
use sedbot_core::protocol::ChatMessage;
use sedbot_core::protocol::EventId;
use sedbot_core::protocol::OutgoingContent;
use sedbot_core::protocol::RoomId;
use sedbot_core::protocol::UserId;

/// One outbound call made by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Reply {
        room_id: RoomId,
        in_reply_to: EventId,
        content: OutgoingContent,
    },
    Edit {
        room_id: RoomId,
        replaces: EventId,
        content: OutgoingContent,
    },
    Redaction {
        room_id: RoomId,
        event_id: EventId,
    },
    MarkRead {
        room_id: RoomId,
        event_id: EventId,
    },
}

/// In-memory gateway that records every request. Sent events get ids
/// `$out1`, `$out2`, ... in order.
#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<Request>>,
    events: Mutex<HashMap<EventId, ChatMessage>>,
    display_names: Mutex<HashMap<UserId, String>>,
    sent: AtomicUsize,
    reject_sends: AtomicBool,
}

impl RecordingGateway {
    /// Make `msg` available to `fetch_event`.
    pub fn insert_event(&self, msg: ChatMessage) {
        self.events
            .lock()
            .unwrap()
            .insert(msg.event_id.clone(), msg);
    }

    pub fn set_display_name(&self, user_id: &str, name: &str) {
        self.display_names
            .lock()
            .unwrap()
            .insert(UserId::from(user_id), name.to_string());
    }

    /// While set, replies and edits fail with `GatewayError::Rejected`.
    pub fn reject_sends(&self, reject: bool) {
        self.reject_sends.store(reject, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Everything except read markers.
    pub fn sent(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| !matches!(r, Request::MarkRead { .. }))
            .collect()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }

    fn next_event_id(&self) -> Result<EventId, GatewayError> {
        if self.reject_sends.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected("sending disabled".to_string()));
        }
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(EventId::new(format!("$out{n}")))
    }
}

#[async_trait]
impl ChatGateway for RecordingGateway {
    async fn send_reply(
        &self,
        room_id: &RoomId,
        in_reply_to: &EventId,
        content: OutgoingContent,
    ) -> Result<EventId, GatewayError> {
        let id = self.next_event_id()?;
        self.record(Request::Reply {
            room_id: room_id.clone(),
            in_reply_to: in_reply_to.clone(),
            content,
        });
        Ok(id)
    }

    async fn send_edit(
        &self,
        room_id: &RoomId,
        replaces: &EventId,
        content: OutgoingContent,
    ) -> Result<EventId, GatewayError> {
        let id = self.next_event_id()?;
        self.record(Request::Edit {
            room_id: room_id.clone(),
            replaces: replaces.clone(),
            content,
        });
        Ok(id)
    }

    async fn send_redaction(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
    ) -> Result<(), GatewayError> {
        self.record(Request::Redaction {
            room_id: room_id.clone(),
            event_id: event_id.clone(),
        });
        Ok(())
    }

    async fn fetch_event(
        &self,
        _room_id: &RoomId,
        event_id: &EventId,
    ) -> Result<ChatMessage, GatewayError> {
        self.events
            .lock()
            .unwrap()
            .get(event_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(event_id.to_string()))
    }

    async fn fetch_display_name(
        &self,
        _room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<String, GatewayError> {
        self.display_names
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(user_id.to_string()))
    }

    async fn mark_read(&self, room_id: &RoomId, event_id: &EventId) -> Result<(), GatewayError> {
        self.record(Request::MarkRead {
            room_id: room_id.clone(),
            event_id: event_id.clone(),
        });
        Ok(())
    }
}
