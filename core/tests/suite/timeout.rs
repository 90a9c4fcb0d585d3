use std::time::Duration;

use core_test_support::gateway::Request;
use core_test_support::room;
use core_test_support::test_sedbot::test_sedbot;
use core_test_support::text;
use pretty_assertions::assert_eq;
use sedbot_core::protocol::EventId;
use sedbot_core::protocol::OutgoingContent;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_substitution_replies_with_timeout_notice() -> anyhow::Result<()> {
    let bot = test_sedbot()
        .with_config(|config| {
            config.exec_timeout = Duration::from_millis(1);
            config.timeout_notice = "too slow".to_string();
        })
        .build()?;
    bot.say(text("$big", "@alice", &"a".repeat(1 << 22))).await;
    bot.say(text("$cmd", "@alice", "s/a/b/g")).await;

    assert_eq!(
        bot.gateway.sent(),
        vec![Request::Reply {
            room_id: room(),
            in_reply_to: EventId::from("$cmd"),
            content: OutgoingContent::notice("too slow"),
        }]
    );
    assert_eq!(
        bot.processor
            .tracker()
            .lookup_correlation(&EventId::from("$cmd")),
        None
    );
    Ok(())
}
