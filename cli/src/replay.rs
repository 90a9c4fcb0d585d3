//! Offline driver: inbound events are read as JSON lines and every request
//! the processor makes of the gateway is written out as a JSON line.

use std::collections::HashMap;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use anyhow::Context;
use async_trait::async_trait;
use sedbot_core::CommandProcessor;
use sedbot_core::config::Config;
use sedbot_core::error::GatewayError;
use sedbot_core::gateway::ChatGateway;
use sedbot_core::protocol::ChatMessage;
use sedbot_core::protocol::EventId;
use sedbot_core::protocol::InboundEvent;
use sedbot_core::protocol::OutgoingContent;
use sedbot_core::protocol::RoomId;
use sedbot_core::protocol::UserId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub(crate) enum GatewayRequest {
    Reply {
        room_id: RoomId,
        in_reply_to: EventId,
        /// Id assigned to the new event.
        event_id: EventId,
        content: OutgoingContent,
    },
    Edit {
        room_id: RoomId,
        replaces: EventId,
        event_id: EventId,
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

/// Gateway that answers fetches from the events replayed so far and writes
/// each outbound request to `out`.
pub(crate) struct JsonLinesGateway<W> {
    out: Mutex<W>,
    events: Mutex<HashMap<EventId, ChatMessage>>,
    next_id: AtomicUsize,
}

impl<W: Write + Send> JsonLinesGateway<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            events: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    fn remember(&self, msg: &ChatMessage) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(msg.event_id.clone(), msg.clone());
    }

    fn allocate_id(&self) -> EventId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        EventId::new(format!("$sedbot-{n}"))
    }

    fn emit(&self, request: &GatewayRequest) -> Result<(), GatewayError> {
        let line =
            serde_json::to_string(request).map_err(|e| GatewayError::Rejected(e.to_string()))?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{line}").map_err(|e| GatewayError::Transport(e.to_string()))
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<W: Write + Send> ChatGateway for JsonLinesGateway<W> {
    async fn send_reply(
        &self,
        room_id: &RoomId,
        in_reply_to: &EventId,
        content: OutgoingContent,
    ) -> Result<EventId, GatewayError> {
        let event_id = self.allocate_id();
        self.emit(&GatewayRequest::Reply {
            room_id: room_id.clone(),
            in_reply_to: in_reply_to.clone(),
            event_id: event_id.clone(),
            content,
        })?;
        Ok(event_id)
    }

    async fn send_edit(
        &self,
        room_id: &RoomId,
        replaces: &EventId,
        content: OutgoingContent,
    ) -> Result<EventId, GatewayError> {
        let event_id = self.allocate_id();
        self.emit(&GatewayRequest::Edit {
            room_id: room_id.clone(),
            replaces: replaces.clone(),
            event_id: event_id.clone(),
            content,
        })?;
        Ok(event_id)
    }

    async fn send_redaction(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
    ) -> Result<(), GatewayError> {
        self.emit(&GatewayRequest::Redaction {
            room_id: room_id.clone(),
            event_id: event_id.clone(),
        })
    }

    async fn fetch_event(
        &self,
        _room_id: &RoomId,
        event_id: &EventId,
    ) -> Result<ChatMessage, GatewayError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(event_id.to_string()))
    }

    async fn fetch_display_name(
        &self,
        _room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<String, GatewayError> {
        Err(GatewayError::NotFound(user_id.to_string()))
    }

    async fn mark_read(&self, room_id: &RoomId, event_id: &EventId) -> Result<(), GatewayError> {
        self.emit(&GatewayRequest::MarkRead {
            room_id: room_id.clone(),
            event_id: event_id.clone(),
        })
    }
}

pub(crate) async fn run_replay(config: Config, file: Option<&Path>) -> anyhow::Result<()> {
    let input: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let gateway = Arc::new(JsonLinesGateway::new(std::io::stdout()));
    replay_events(config, input, gateway).await
}

async fn replay_events<W>(
    config: Config,
    input: impl BufRead,
    gateway: Arc<JsonLinesGateway<W>>,
) -> anyhow::Result<()>
where
    W: Write + Send + 'static,
{
    let processor = CommandProcessor::with_gateway(config, gateway.clone());
    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: InboundEvent = serde_json::from_str(&line)
            .with_context(|| format!("invalid event on line {}", idx + 1))?;
        if let InboundEvent::Message(msg) = &event {
            gateway.remember(msg);
        }
        processor.handle_event(event).await;
    }
    Ok(())
}
