#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use sedbot_core::config::Config;
use sedbot_core::config::ConfigOverrides;
use sedbot_core::config::ConfigToml;
use sedbot_core::protocol::ChatMessage;
use sedbot_core::protocol::EventId;
use sedbot_core::protocol::MessageKind;
use sedbot_core::protocol::RoomId;
use sedbot_core::protocol::UserId;
use tempfile::TempDir;

pub mod gateway;
pub mod test_sedbot;

pub const ROOM: &str = "!room:example.org";

/// Note TempDir is required to ensure tests create a unique config directory
/// for each test run so they do not interfere with each other.
pub fn load_default_config_for_test(sedbot_home: &TempDir) -> Config {
    Config::load_from_base_config_with_overrides(
        ConfigToml::default(),
        ConfigOverrides::default(),
        sedbot_home.path().to_path_buf(),
    )
    .expect("defaults for test should always succeed")
}

/// Fixed clock: `secs` seconds after an arbitrary epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// A plain text message in [`ROOM`], sent at `at(0)`.
pub fn text(event_id: &str, sender: &str, body: &str) -> ChatMessage {
    ChatMessage {
        event_id: EventId::from(event_id),
        room_id: RoomId::from(ROOM),
        sender: UserId::from(sender),
        body: body.to_string(),
        timestamp: at(0),
        kind: MessageKind::Text,
        reply_to: None,
        edit_of: None,
    }
}

pub fn emote(event_id: &str, sender: &str, body: &str) -> ChatMessage {
    ChatMessage {
        kind: MessageKind::Emote,
        ..text(event_id, sender, body)
    }
}

/// `new_body` replacing the content of `original`.
pub fn edit(event_id: &str, original: &str, sender: &str, new_body: &str) -> ChatMessage {
    ChatMessage {
        edit_of: Some(EventId::from(original)),
        ..text(event_id, sender, new_body)
    }
}

pub fn room() -> RoomId {
    RoomId::from(ROOM)
}
