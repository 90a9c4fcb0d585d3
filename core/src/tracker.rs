//! In-memory conversation state: recent messages per room, each sender's
//! latest message, and the command → output correlation table.
//!
//! Rooms are independent: each has its own lock, and the room map itself is
//! only write-locked to insert a room the first time it is seen. No lock is
//! ever held across an `.await`.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;

use lru::LruCache;

use crate::protocol::ChatMessage;
use crate::protocol::EventId;
use crate::protocol::RoomId;
use crate::protocol::UserId;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;
pub const DEFAULT_CORRELATION_CAPACITY: usize = 4096;

/// Links a processed command to the message it rewrote and the reply it
/// produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationRecord {
    pub room_id: RoomId,
    pub target_event_id: EventId,
    pub output_event_id: EventId,
}

#[derive(Debug)]
struct RoomHistory {
    /// Newest first.
    recent: VecDeque<ChatMessage>,
    latest_by_sender: HashMap<UserId, ChatMessage>,
}

impl RoomHistory {
    fn new(capacity: usize) -> Self {
        Self {
            recent: VecDeque::with_capacity(capacity),
            latest_by_sender: HashMap::new(),
        }
    }

    fn push(&mut self, msg: ChatMessage, capacity: usize) {
        self.latest_by_sender.insert(msg.sender.clone(), msg.clone());
        self.recent.push_front(msg);
        self.recent.truncate(capacity);
    }
}

pub struct ConversationTracker {
    capacity: usize,
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<RoomHistory>>>>,
    correlations: Mutex<LruCache<EventId, CorrelationRecord>>,
}

impl Default for ConversationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, DEFAULT_CORRELATION_CAPACITY)
    }
}

impl ConversationTracker {
    /// `history_capacity` bounds each room's FIFO; `correlation_capacity`
    /// bounds the correlation table (least recently used records go first).
    /// Zero capacities are bumped to one.
    pub fn new(history_capacity: usize, correlation_capacity: usize) -> Self {
        let correlation_capacity =
            NonZeroUsize::new(correlation_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity: history_capacity.max(1),
            rooms: RwLock::new(HashMap::new()),
            correlations: Mutex::new(LruCache::new(correlation_capacity)),
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.capacity
    }

    /// Push `msg` into its room's FIFO (evicting the oldest entry at
    /// capacity) and make it the sender's most recent message in the room.
    pub fn record_message(&self, msg: &ChatMessage) {
        let room = self.room_or_insert(&msg.room_id);
        lock(&room).push(msg.clone(), self.capacity);
    }

    pub fn most_recent_for(&self, room_id: &RoomId, sender: &UserId) -> Option<ChatMessage> {
        let room = self.room(room_id)?;
        let history = lock(&room);
        history.latest_by_sender.get(sender).cloned()
    }

    /// The room's recent messages, newest first.
    pub fn recent_in_room(&self, room_id: &RoomId) -> Vec<ChatMessage> {
        let Some(room) = self.room(room_id) else {
            return Vec::new();
        };
        let history = lock(&room);
        history.recent.iter().cloned().collect()
    }

    /// Whether `event_id` is still inside the room's bounded FIFO.
    pub fn is_recent(&self, room_id: &RoomId, event_id: &EventId) -> bool {
        let Some(room) = self.room(room_id) else {
            return false;
        };
        let history = lock(&room);
        history.recent.iter().any(|m| &m.event_id == event_id)
    }

    /// Replace the body of a stored message after its author edited it.
    /// Returns false when the message is no longer tracked.
    pub fn apply_edit(&self, room_id: &RoomId, event_id: &EventId, new_body: &str) -> bool {
        let Some(room) = self.room(room_id) else {
            return false;
        };
        let mut history = lock(&room);
        let mut found = false;
        for msg in history.recent.iter_mut().filter(|m| &m.event_id == event_id) {
            msg.body = new_body.to_string();
            found = true;
        }
        for msg in history
            .latest_by_sender
            .values_mut()
            .filter(|m| &m.event_id == event_id)
        {
            msg.body = new_body.to_string();
            found = true;
        }
        found
    }

    /// Drop a redacted message from the room's history.
    pub fn forget(&self, room_id: &RoomId, event_id: &EventId) {
        let Some(room) = self.room(room_id) else {
            return;
        };
        let mut history = lock(&room);
        history.recent.retain(|m| &m.event_id != event_id);
        history
            .latest_by_sender
            .retain(|_, m| &m.event_id != event_id);
    }

    pub fn record_correlation(
        &self,
        command_event_id: EventId,
        room_id: RoomId,
        target_event_id: EventId,
        output_event_id: EventId,
    ) {
        lock(&self.correlations).put(
            command_event_id,
            CorrelationRecord {
                room_id,
                target_event_id,
                output_event_id,
            },
        );
    }

    pub fn lookup_correlation(&self, command_event_id: &EventId) -> Option<CorrelationRecord> {
        lock(&self.correlations).get(command_event_id).cloned()
    }

    pub fn remove_correlation(&self, command_event_id: &EventId) -> Option<CorrelationRecord> {
        lock(&self.correlations).pop(command_event_id)
    }

    fn room(&self, room_id: &RoomId) -> Option<Arc<Mutex<RoomHistory>>> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .cloned()
    }

    fn room_or_insert(&self, room_id: &RoomId) -> Arc<Mutex<RoomHistory>> {
        if let Some(room) = self.room(room_id) {
            return room;
        }
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            rooms
                .entry(room_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(RoomHistory::new(self.capacity)))),
        )
    }
}

/// A panic while holding one of these locks cannot leave the maps half
/// updated, so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
