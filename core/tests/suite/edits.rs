use core_test_support::edit;
use core_test_support::gateway::Request;
use core_test_support::room;
use core_test_support::test_sedbot::test_sedbot;
use core_test_support::text;
use pretty_assertions::assert_eq;
use sedbot_core::protocol::EventId;
use sedbot_core::protocol::OutgoingContent;

#[tokio::test]
async fn edited_command_edits_previous_output() -> anyhow::Result<()> {
    let bot = test_sedbot().build()?;
    bot.say(text("$e2", "@alice", "foo baz foo")).await;
    bot.say(text("$e1", "@alice", "s/foo/bar/")).await;
    // A newer candidate must not attract the re-run.
    bot.say(text("$e5", "@bob", "foo")).await;
    bot.edit(edit("$e4", "$e1", "@alice", "s/foo/qux/g")).await;

    assert_eq!(
        bot.gateway.sent(),
        vec![
            Request::Reply {
                room_id: room(),
                in_reply_to: EventId::from("$e2"),
                content: OutgoingContent::html_notice("bar baz foo", "<u>bar</u> baz foo"),
            },
            Request::Edit {
                room_id: room(),
                replaces: EventId::from("$out1"),
                content: OutgoingContent::html_notice(
                    "qux baz qux",
                    "<u>qux</u> baz <u>qux</u>"
                ),
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn edited_command_that_stops_parsing_changes_nothing() -> anyhow::Result<()> {
    let bot = test_sedbot().build()?;
    bot.say(text("$e2", "@alice", "foo")).await;
    bot.say(text("$e1", "@alice", "s/foo/bar/")).await;
    bot.edit(edit("$e3", "$e1", "@alice", "never mind")).await;
    bot.edit(edit("$e4", "$e1", "@alice", "s/zzz/bar/")).await;

    assert_eq!(bot.gateway.sent().len(), 1);
    assert!(
        bot.processor
            .tracker()
            .lookup_correlation(&EventId::from("$e1"))
            .is_some()
    );
    Ok(())
}

#[tokio::test]
async fn edit_turning_message_into_command_runs_it() -> anyhow::Result<()> {
    let bot = test_sedbot().build()?;
    bot.say(text("$e1", "@alice", "foo baz")).await;
    bot.say(text("$e2", "@alice", "hello")).await;
    bot.edit(edit("$e3", "$e2", "@alice", "s/foo/bar/")).await;

    assert_eq!(
        bot.gateway.sent(),
        vec![Request::Reply {
            room_id: room(),
            in_reply_to: EventId::from("$e1"),
            content: OutgoingContent::html_notice("bar baz", "<u>bar</u> baz"),
        }]
    );
    let recent = bot.processor.tracker().recent_in_room(&room());
    assert_eq!(
        recent
            .iter()
            .map(|m| m.event_id.to_string())
            .collect::<Vec<_>>(),
        vec!["$e1".to_string()]
    );

    // The correlation is keyed by the edited event, so redacting it
    // propagates.
    bot.redact("$e2").await;
    assert_eq!(
        bot.gateway.sent().last(),
        Some(&Request::Redaction {
            room_id: room(),
            event_id: EventId::from("$out1"),
        })
    );
    Ok(())
}

#[tokio::test]
async fn edits_of_plain_messages_update_history() -> anyhow::Result<()> {
    let bot = test_sedbot().build()?;
    bot.say(text("$e1", "@alice", "teh cat")).await;
    bot.edit(edit("$e2", "$e1", "@alice", "the cat sat")).await;
    bot.say(text("$e3", "@alice", "s/cat/dog/")).await;

    assert_eq!(
        bot.gateway.sent(),
        vec![Request::Reply {
            room_id: room(),
            in_reply_to: EventId::from("$e1"),
            content: OutgoingContent::html_notice("the dog sat", "the <u>dog</u> sat"),
        }]
    );
    Ok(())
}
