//! Orchestrates one inbound event at a time: parse, pick a target, execute,
//! render, emit, then remember what was produced.
//!
//! Every failure other than a timeout ends silently. Commands are matched
//! against ambient chat text, so a false positive must never produce a reply.

use std::sync::Arc;

use chrono::TimeDelta;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::error::ExecError;
use crate::error::ParseError;
use crate::executor::BoundedExecutor;
use crate::gateway::ChatGateway;
use crate::highlight::escape;
use crate::highlight::highlight;
use crate::protocol::ChatMessage;
use crate::protocol::EventId;
use crate::protocol::InboundEvent;
use crate::protocol::OutgoingContent;
use crate::protocol::RoomId;
use crate::statement::SubstitutionStatement;
use crate::statement::parse_with_rules;
use crate::tracker::ConversationTracker;
use crate::tracker::CorrelationRecord;
use crate::trigger;

/// A target message together with its rewritten body.
struct Rewrite {
    target: ChatMessage,
    replaced: String,
}

pub struct CommandProcessor {
    config: Config,
    gateway: Arc<dyn ChatGateway>,
    tracker: Arc<ConversationTracker>,
    executor: BoundedExecutor,
}

impl CommandProcessor {
    pub fn new(
        config: Config,
        gateway: Arc<dyn ChatGateway>,
        tracker: Arc<ConversationTracker>,
    ) -> Self {
        let executor = BoundedExecutor::new(config.exec_timeout);
        Self {
            config,
            gateway,
            tracker,
            executor,
        }
    }

    /// Build a processor with a fresh tracker sized from `config`.
    pub fn with_gateway(config: Config, gateway: Arc<dyn ChatGateway>) -> Self {
        let tracker = Arc::new(ConversationTracker::new(
            config.history_capacity,
            config.correlation_capacity,
        ));
        Self::new(config, gateway, tracker)
    }

    pub fn tracker(&self) -> &Arc<ConversationTracker> {
        &self.tracker
    }

    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message(msg) => self.handle_message(msg).await,
            InboundEvent::Edit(msg) => self.handle_edit(msg).await,
            InboundEvent::Redaction { room_id, redacts } => {
                self.handle_redaction(&room_id, &redacts).await
            }
        }
    }

    pub async fn handle_message(&self, msg: ChatMessage) {
        if self.is_own(&msg) {
            return;
        }
        match self.parse_command(&msg.body) {
            Some(Ok(statement)) => {
                let command_id = msg.event_id.clone();
                self.run_command(&msg, &command_id, &statement).await;
            }
            Some(Err(err)) => {
                debug!(event_id = %msg.event_id, "ignoring sed-like text: {err}");
                self.tracker.record_message(&msg);
            }
            None => self.tracker.record_message(&msg),
        }
    }

    /// `edit.edit_of` names the message being replaced. An edited command
    /// that already produced output rewrites that output; an edit that turns
    /// a message into a command runs it; any other edit updates history.
    pub async fn handle_edit(&self, edit: ChatMessage) {
        if self.is_own(&edit) {
            return;
        }
        let Some(original_id) = edit.edit_of.clone() else {
            debug!(event_id = %edit.event_id, "edit without a replaced event, treating as message");
            return self.handle_message(edit).await;
        };

        let command = self.parse_command(&edit.body);
        if let Some(record) = self.tracker.lookup_correlation(&original_id) {
            match command {
                Some(Ok(statement)) => self.redirect(&edit, &record, &statement).await,
                Some(Err(err)) => {
                    debug!(event_id = %original_id, "edited command no longer parses: {err}");
                }
                None => debug!(event_id = %original_id, "edited command is no longer a command"),
            }
            return;
        }

        match command {
            Some(Ok(statement)) => {
                self.tracker.forget(&edit.room_id, &original_id);
                self.run_command(&edit, &original_id, &statement).await;
            }
            _ => {
                if !self
                    .tracker
                    .apply_edit(&edit.room_id, &original_id, &edit.body)
                {
                    debug!(event_id = %original_id, "edit of an untracked message");
                }
            }
        }
    }

    /// Forget the redacted message and, if it was a command, redact the
    /// output it produced.
    pub async fn handle_redaction(&self, room_id: &RoomId, redacts: &EventId) {
        self.tracker.forget(room_id, redacts);
        let Some(record) = self.tracker.lookup_correlation(redacts) else {
            return;
        };
        match self
            .gateway
            .send_redaction(&record.room_id, &record.output_event_id)
            .await
        {
            Ok(()) => {
                self.tracker.remove_correlation(redacts);
                info!(command = %redacts, output = %record.output_event_id, "redacted output of redacted command");
            }
            Err(err) => warn!("failed to redact {}: {err}", record.output_event_id),
        }
    }

    fn is_own(&self, msg: &ChatMessage) -> bool {
        self.config.own_user_id.as_ref() == Some(&msg.sender)
    }

    fn parse_command(&self, body: &str) -> Option<Result<SubstitutionStatement, ParseError>> {
        let command = trigger::detect(body, &self.config.triggers)?;
        let rules = self.config.triggers.rules_for(command.surface);
        Some(parse_with_rules(command.text, rules))
    }

    /// `command` is the event carrying the statement; `command_id` is the id
    /// the resulting correlation is keyed by (the original event for edits).
    async fn run_command(
        &self,
        command: &ChatMessage,
        command_id: &EventId,
        statement: &SubstitutionStatement,
    ) {
        let room_id = &command.room_id;
        if let Err(err) = self.gateway.mark_read(room_id, &command.event_id).await {
            warn!("failed to mark {} read: {err}", command.event_id);
        }

        let rewrite = match self.resolve_target(command, statement).await {
            Ok(Some(rewrite)) => rewrite,
            Ok(None) => {
                debug!(event_id = %command_id, "no message changed by substitution");
                return;
            }
            Err(err) => return self.report_failure(room_id, command_id, err).await,
        };

        let content = self.render(room_id, &rewrite, statement).await;
        match self
            .gateway
            .send_reply(room_id, &rewrite.target.event_id, content)
            .await
        {
            Ok(output_id) => {
                info!(command = %command_id, target = %rewrite.target.event_id, output = %output_id, "sent substitution");
                self.tracker.record_correlation(
                    command_id.clone(),
                    room_id.clone(),
                    rewrite.target.event_id,
                    output_id,
                );
            }
            Err(err) => warn!("failed to send substitution for {command_id}: {err}"),
        }
    }

    /// Re-run an edited command against its original target and replace the
    /// output it produced earlier.
    async fn redirect(
        &self,
        edit: &ChatMessage,
        record: &CorrelationRecord,
        statement: &SubstitutionStatement,
    ) {
        let room_id = &record.room_id;
        let Some(target) = self.find_message(room_id, &record.target_event_id).await else {
            return;
        };
        let rewrite = match self.try_candidate(statement, target).await {
            Ok(Some(rewrite)) => rewrite,
            Ok(None) => {
                debug!(event_id = %record.target_event_id, "edited command no longer changes its target");
                return;
            }
            Err(err) => {
                let command_id = edit.edit_of.as_ref().unwrap_or(&edit.event_id);
                return self.report_failure(room_id, command_id, err).await;
            }
        };

        let content = self.render(room_id, &rewrite, statement).await;
        if let Err(err) = self
            .gateway
            .send_edit(room_id, &record.output_event_id, content)
            .await
        {
            warn!("failed to edit {}: {err}", record.output_event_id);
        }
    }

    /// Pick the message to rewrite: the replied-to message, then the sender's
    /// own last message, then the rest of the room newest first. Each
    /// candidate is tried at most once and the first one that changes wins.
    async fn resolve_target(
        &self,
        command: &ChatMessage,
        statement: &SubstitutionStatement,
    ) -> Result<Option<Rewrite>, ExecError> {
        let room_id = &command.room_id;
        let mut tried: Vec<EventId> = Vec::new();
        if let Some(reply_to) = &command.reply_to {
            tried.push(reply_to.clone());
            if let Some(target) = self.find_message(room_id, reply_to).await
                && let Some(rewrite) = self.try_candidate(statement, target).await?
            {
                return Ok(Some(rewrite));
            }
        }

        let own = self
            .tracker
            .most_recent_for(room_id, &command.sender)
            .filter(|own| !tried.contains(&own.event_id) && self.is_eligible(command, own));
        if let Some(own) = own {
            tried.push(own.event_id.clone());
            if let Some(rewrite) = self.try_candidate(statement, own).await? {
                return Ok(Some(rewrite));
            }
        }

        for candidate in self.tracker.recent_in_room(room_id) {
            if tried.contains(&candidate.event_id) {
                continue;
            }
            if let Some(rewrite) = self.try_candidate(statement, candidate).await? {
                return Ok(Some(rewrite));
            }
        }
        Ok(None)
    }

    /// The sender's last message qualifies while it is still in the room
    /// history or younger than the recency window.
    fn is_eligible(&self, command: &ChatMessage, own: &ChatMessage) -> bool {
        if self.tracker.is_recent(&own.room_id, &own.event_id) {
            return true;
        }
        let window = TimeDelta::from_std(self.config.recency_window).unwrap_or(TimeDelta::MAX);
        command.timestamp - own.timestamp <= window
    }

    /// `Ok(None)` when the substitution leaves the text unchanged.
    async fn try_candidate(
        &self,
        statement: &SubstitutionStatement,
        target: ChatMessage,
    ) -> Result<Option<Rewrite>, ExecError> {
        let replaced = self.executor.execute(statement, &target.body).await?;
        if replaced == target.body {
            return Ok(None);
        }
        Ok(Some(Rewrite { target, replaced }))
    }

    async fn find_message(&self, room_id: &RoomId, event_id: &EventId) -> Option<ChatMessage> {
        if let Some(msg) = self
            .tracker
            .recent_in_room(room_id)
            .into_iter()
            .find(|msg| &msg.event_id == event_id)
        {
            return Some(msg);
        }
        match self.gateway.fetch_event(room_id, event_id).await {
            Ok(msg) => Some(msg),
            Err(err) => {
                warn!("failed to fetch {event_id}: {err}");
                None
            }
        }
    }

    async fn render(
        &self,
        room_id: &RoomId,
        rewrite: &Rewrite,
        statement: &SubstitutionStatement,
    ) -> OutgoingContent {
        let Rewrite { target, replaced } = rewrite;
        let formatted =
            highlight_blocking(replaced, &target.body, statement.highlight_edits).await;
        if !target.is_emote() {
            return OutgoingContent::html_notice(replaced.clone(), formatted);
        }

        let name = match self.gateway.fetch_display_name(room_id, &target.sender).await {
            Ok(name) => name,
            Err(err) => {
                warn!("failed to fetch display name of {}: {err}", target.sender);
                target.sender.to_string()
            }
        };
        OutgoingContent::html_notice(
            format!("* {name} {replaced}"),
            format!("* {} {formatted}", escape(&name)),
        )
    }

    async fn report_failure(&self, room_id: &RoomId, command_id: &EventId, err: ExecError) {
        if !matches!(err, ExecError::Timeout(_)) {
            debug!(event_id = %command_id, "substitution failed: {err}");
            return;
        }
        let notice = OutgoingContent::notice(self.config.timeout_notice.clone());
        if let Err(err) = self.gateway.send_reply(room_id, command_id, notice).await {
            warn!("failed to report timeout for {command_id}: {err}");
        }
    }
}

/// The diff is CPU-bound, so it runs on the blocking pool.
async fn highlight_blocking(new_text: &str, old_text: &str, enabled: bool) -> String {
    let (new, old) = (new_text.to_string(), old_text.to_string());
    match tokio::task::spawn_blocking(move || highlight(&new, &old, enabled)).await {
        Ok(formatted) => formatted,
        Err(err) => {
            warn!("highlighting failed: {err}");
            escape(new_text)
        }
    }
}
