use std::collections::HashMap;
use std::sync::Arc;

use matchday_core::chrono::Utc;
use matchday_core::dialog::format_classifier_reply;
use matchday_core::{
    ClassifierError, ClassifyFields, ConversationRecord, ConversationStore, DialogContext,
    DialogEngine, DialogEvent, EventError, IntentClassifier, OutboundAction, Phase,
    TransitionOutcome,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::api::{ChatApi, MessageId};
use crate::commands::{parse_schedule_command, ScheduleCommand, ScheduleCommandPayload};
use crate::events::{strip_bot_mention, ChatEvent, EventContext};
use crate::widgets::{confirmation_group, time_selection_group, with_selection, ButtonGroup};

/// What the router did with one event, surfaced for logging and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Handled {
    /// A transition was persisted and its actions executed.
    Applied { phase: Phase },
    /// A stateless reply went out (mentions, command acknowledgements).
    Replied,
    /// The classifier failed; the user got an apology, state unchanged.
    Apologized,
    /// The event matched no transition for the current phase.
    NoOp,
    /// Not addressed to the router at all (self-events, unknown types).
    Ignored,
}

#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Channel where time-proposal polls are posted.
    pub channel_id: String,
    pub greeting: String,
    /// The bot's own user id; its echoes and seed reactions are dropped.
    pub bot_user_id: String,
}

/// Keyed async mutexes serializing all handling for one user. Two
/// concurrent events for the same user (a rapid double-click) run their
/// whole load → classify → persist → render section one after the other.
#[derive(Default)]
struct UserLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(user_id.to_owned()).or_default())
        };
        lock.lock_owned().await
    }
}

/// The only component with transport side effects. For each event:
/// resolve the acting conversation, delegate to the state machine,
/// persist, then notify. Every failure is contained to the one event.
pub struct InteractionRouter {
    api: Arc<dyn ChatApi>,
    store: Arc<dyn ConversationStore>,
    classifier: Arc<dyn IntentClassifier>,
    engine: DialogEngine,
    config: RouterConfig,
    locks: UserLocks,
}

impl InteractionRouter {
    pub fn new(
        api: Arc<dyn ChatApi>,
        store: Arc<dyn ConversationStore>,
        classifier: Arc<dyn IntentClassifier>,
        engine: DialogEngine,
        config: RouterConfig,
    ) -> Self {
        Self { api, store, classifier, engine, config, locks: UserLocks::default() }
    }

    pub async fn handle(
        &self,
        event: &ChatEvent,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        match event {
            ChatEvent::DirectMessage { user_id, text } => {
                self.on_direct_message(user_id, text, ctx).await
            }
            ChatEvent::ChannelMention { channel_id, user_id, text } => {
                self.on_channel_mention(channel_id, user_id, text, ctx).await
            }
            ChatEvent::ButtonClick { message_id, component_id, user_id } => {
                self.on_button_click(message_id, component_id, user_id, ctx).await
            }
            ChatEvent::ReactionAdded { message_id, user_id, emoji } => {
                self.on_poll_reaction(message_id, user_id, emoji, true, ctx).await
            }
            ChatEvent::ReactionRemoved { message_id, user_id, emoji } => {
                self.on_poll_reaction(message_id, user_id, emoji, false, ctx).await
            }
            ChatEvent::Command(payload) => self.on_command(payload, ctx).await,
            ChatEvent::Unsupported { event_type } => {
                debug!(
                    event_name = "router.event_unsupported",
                    event_type = %event_type,
                    correlation_id = %ctx.correlation_id,
                    "dropping unsupported event type"
                );
                Ok(Handled::Ignored)
            }
        }
    }

    async fn on_direct_message(
        &self,
        user_id: &str,
        text: &str,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        if user_id == self.config.bot_user_id {
            return Ok(Handled::Ignored);
        }

        let _guard = self.locks.acquire(user_id).await;
        let record = self.load(user_id).await?;

        if !record.phase.interprets_text() {
            debug!(
                event_name = "router.event_ignored",
                user_id = %user_id,
                phase = record.phase.as_str(),
                correlation_id = %ctx.correlation_id,
                "direct message outside an interpreting phase"
            );
            return Ok(Handled::NoOp);
        }

        let fields = ClassifyFields::direct_message(text, record.phase.as_str());
        let classification = match self.classifier.classify(&fields).await {
            Ok(classification) => classification,
            Err(error) => return self.apologize_dm(user_id, error, ctx).await,
        };

        let event = DialogEvent::DirectMessage { text: text.to_owned() };
        let outcome =
            self.engine.transition(record.phase, &record.context, &event, Some(&classification));
        self.apply(record, outcome, None, ctx).await
    }

    async fn on_channel_mention(
        &self,
        channel_id: &str,
        user_id: &str,
        text: &str,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        if user_id == self.config.bot_user_id {
            return Ok(Handled::Ignored);
        }

        let content = strip_bot_mention(text, &self.config.bot_user_id);
        match self.classifier.classify(&ClassifyFields::mention(content)).await {
            Ok(classification) => {
                let reply = format_classifier_reply(&classification);
                self.send_channel(channel_id, &reply, None, ctx).await;
                Ok(Handled::Replied)
            }
            Err(error) => {
                let event_error = EventError::from(error);
                warn!(
                    event_name = "router.classifier_failed",
                    channel_id = %channel_id,
                    correlation_id = %ctx.correlation_id,
                    error = %event_error,
                    "mention classification failed"
                );
                if let Some(message) = event_error.user_message() {
                    self.send_channel(channel_id, message, None, ctx).await;
                }
                Ok(Handled::Apologized)
            }
        }
    }

    async fn on_button_click(
        &self,
        message_id: &str,
        component_id: &str,
        user_id: &str,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        let _guard = self.locks.acquire(user_id).await;
        let record = self.load(user_id).await?;

        let event = DialogEvent::ButtonClick { component_id: component_id.to_owned() };
        let outcome = self.engine.transition(record.phase, &record.context, &event, None);
        self.apply(record, outcome, Some(&MessageId(message_id.to_owned())), ctx).await
    }

    async fn on_poll_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
        added: bool,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        // The bot seeds 👍/👎 on every poll; its own reactions echo back.
        if user_id == self.config.bot_user_id {
            return Ok(Handled::Ignored);
        }

        let Some(owner) = self.store.find_by_poll_message(message_id).await? else {
            debug!(
                event_name = "router.event_ignored",
                message_id = %message_id,
                correlation_id = %ctx.correlation_id,
                "reaction on an untracked message"
            );
            return Ok(Handled::NoOp);
        };

        let _guard = self.locks.acquire(&owner.user_id).await;
        // Reload under the lock; the poll may have resolved meanwhile.
        let record = self.load(&owner.user_id).await?;
        if record.context.poll_message_id.as_deref() != Some(message_id) {
            return Ok(Handled::NoOp);
        }

        let event = DialogEvent::PollReaction { emoji: emoji.to_owned(), added };
        let outcome = self.engine.transition(record.phase, &record.context, &event, None);
        self.apply(record, outcome, None, ctx).await
    }

    async fn on_command(
        &self,
        payload: &ScheduleCommandPayload,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        let command = match parse_schedule_command(payload.clone()) {
            Ok(command) => command,
            Err(error) => {
                warn!(
                    event_name = "router.command_rejected",
                    command = %payload.command,
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "malformed command"
                );
                self.send_channel(
                    &payload.channel_id,
                    &format!("That didn't work: {error}"),
                    None,
                    ctx,
                )
                .await;
                return Ok(Handled::Ignored);
            }
        };

        self.begin_schedule(&command, ctx).await
    }

    async fn begin_schedule(
        &self,
        command: &ScheduleCommand,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        let target = &command.target_user_id;
        let _guard = self.locks.acquire(target).await;
        let record = self.load(target).await?;

        let outcome =
            self.engine.transition(record.phase, &record.context, &DialogEvent::BeginSchedule, None);
        if outcome.is_no_op(record.phase, &record.context) {
            self.send_channel(
                &command.channel_id,
                &format!("Scheduling with <@{target}> is already in progress."),
                None,
                ctx,
            )
            .await;
            return Ok(Handled::NoOp);
        }

        // The greeting is the conversation-opening contact: no delivered
        // DM, no record. Send first, persist on success.
        if let Err(error) = self.api.send_direct_message(target, &self.config.greeting, None).await
        {
            warn!(
                event_name = "router.greeting_failed",
                user_id = %target,
                correlation_id = %ctx.correlation_id,
                error = %error,
                "scheduling DM could not be delivered; state not advanced"
            );
            self.send_channel(
                &command.channel_id,
                &format!("Couldn't send the scheduling DM to <@{target}>: {error}"),
                None,
                ctx,
            )
            .await;
            return Ok(Handled::Replied);
        }

        let new_record = ConversationRecord {
            user_id: target.clone(),
            phase: outcome.phase,
            context: outcome.context,
            updated_at: Utc::now(),
        };
        self.store.upsert(&new_record).await?;

        info!(
            event_name = "router.schedule_initiated",
            user_id = %target,
            invoker_id = %command.invoker_id,
            correlation_id = %ctx.correlation_id,
            "scheduling conversation opened"
        );
        self.send_channel(&command.channel_id, "Scheduling DM sent.", None, ctx).await;
        Ok(Handled::Applied { phase: new_record.phase })
    }

    /// Persist-then-notify for one computed transition.
    async fn apply(
        &self,
        record: ConversationRecord,
        outcome: TransitionOutcome,
        source_message: Option<&MessageId>,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        if outcome.is_no_op(record.phase, &record.context) {
            debug!(
                event_name = "router.event_ignored",
                user_id = %record.user_id,
                phase = record.phase.as_str(),
                correlation_id = %ctx.correlation_id,
                "event matched no transition"
            );
            return Ok(Handled::NoOp);
        }

        let mut new_record = ConversationRecord {
            user_id: record.user_id.clone(),
            phase: outcome.phase,
            context: outcome.context,
            updated_at: Utc::now(),
        };
        self.store.upsert(&new_record).await?;

        info!(
            event_name = "router.transition_applied",
            user_id = %new_record.user_id,
            from = record.phase.as_str(),
            to = new_record.phase.as_str(),
            correlation_id = %ctx.correlation_id,
            "dialog transition persisted"
        );

        for action in &outcome.actions {
            self.execute(&mut new_record, action, source_message, ctx).await?;
        }

        Ok(Handled::Applied { phase: new_record.phase })
    }

    async fn execute(
        &self,
        record: &mut ConversationRecord,
        action: &OutboundAction,
        source_message: Option<&MessageId>,
        ctx: &EventContext,
    ) -> Result<(), EventError> {
        match action {
            OutboundAction::SendGreeting => {
                self.send_dm(&record.user_id, &self.config.greeting, None, ctx).await;
            }
            OutboundAction::ReplyText(text) => {
                self.send_dm(&record.user_id, text, None, ctx).await;
            }
            OutboundAction::PostPoll { day, time } => {
                let text = format!("How about {day} at {time}?");
                match self.api.reply_channel(&self.config.channel_id, &text, None).await {
                    Ok(message_id) => {
                        for emoji in ["👍", "👎"] {
                            if let Err(error) = self.api.react(&message_id, emoji).await {
                                warn!(
                                    event_name = "router.delivery_failed",
                                    correlation_id = %ctx.correlation_id,
                                    error = %error,
                                    "seed reaction failed"
                                );
                            }
                        }
                        // The message id exists only after the send; track
                        // it with a follow-up write.
                        record.context.poll_message_id = Some(message_id.0.clone());
                        record.updated_at = Utc::now();
                        self.store.upsert(record).await?;
                    }
                    Err(error) => {
                        warn!(
                            event_name = "router.delivery_failed",
                            correlation_id = %ctx.correlation_id,
                            error = %error,
                            "poll post failed; polling continues without a tracked message"
                        );
                    }
                }
            }
            OutboundAction::SendTimeOptions { options } => {
                let group = time_selection_group(options);
                self.send_dm(
                    &record.user_id,
                    "Here are some times that work for us:",
                    Some(&group),
                    ctx,
                )
                .await;
            }
            OutboundAction::SendConfirmationPrompt => {
                let group = confirmation_group(false, false);
                let text = confirmation_prompt_text(&record.context);
                self.send_dm(&record.user_id, &text, Some(&group), ctx).await;
            }
            OutboundAction::RenderConfirmation { selected } => {
                if let Some(message_id) = source_message {
                    let locked =
                        with_selection(&confirmation_group(false, false), selected.component_id());
                    self.edit(message_id, &locked, ctx).await;
                }
            }
            OutboundAction::RenderTimeSelection { selected_id, options } => {
                if let Some(message_id) = source_message {
                    let locked = with_selection(&time_selection_group(options), selected_id);
                    self.edit(message_id, &locked, ctx).await;
                }
            }
        }

        Ok(())
    }

    async fn apologize_dm(
        &self,
        user_id: &str,
        error: ClassifierError,
        ctx: &EventContext,
    ) -> Result<Handled, EventError> {
        let event_error = EventError::from(error);
        warn!(
            event_name = "router.classifier_failed",
            user_id = %user_id,
            correlation_id = %ctx.correlation_id,
            error = %event_error,
            "classification failed; phase unchanged"
        );
        if let Some(message) = event_error.user_message() {
            self.send_dm(user_id, message, None, ctx).await;
        }
        Ok(Handled::Apologized)
    }

    async fn load(&self, user_id: &str) -> Result<ConversationRecord, EventError> {
        Ok(self
            .store
            .find(user_id)
            .await?
            .unwrap_or_else(|| ConversationRecord::absent(user_id)))
    }

    async fn send_dm(
        &self,
        user_id: &str,
        text: &str,
        buttons: Option<&ButtonGroup>,
        ctx: &EventContext,
    ) {
        if let Err(error) = self.api.send_direct_message(user_id, text, buttons).await {
            warn!(
                event_name = "router.delivery_failed",
                user_id = %user_id,
                correlation_id = %ctx.correlation_id,
                error = %error,
                "direct message delivery failed"
            );
        }
    }

    async fn send_channel(
        &self,
        channel_id: &str,
        text: &str,
        buttons: Option<&ButtonGroup>,
        ctx: &EventContext,
    ) {
        if let Err(error) = self.api.reply_channel(channel_id, text, buttons).await {
            warn!(
                event_name = "router.delivery_failed",
                channel_id = %channel_id,
                correlation_id = %ctx.correlation_id,
                error = %error,
                "channel delivery failed"
            );
        }
    }

    async fn edit(&self, message_id: &MessageId, group: &ButtonGroup, ctx: &EventContext) {
        if let Err(error) = self.api.edit_message(message_id, group).await {
            warn!(
                event_name = "router.delivery_failed",
                message_id = %message_id.0,
                correlation_id = %ctx.correlation_id,
                error = %error,
                "message edit failed"
            );
        }
    }
}

fn confirmation_prompt_text(context: &DialogContext) -> String {
    if let Some(option) = &context.selected_option {
        return format!("Lock in {option}?");
    }
    match (&context.proposed_day, &context.proposed_time) {
        (Some(day), Some(time)) => {
            format!("The team is in for {day} at {time}. Lock it in?")
        }
        _ => "Lock in the proposed time?".to_owned(),
    }
}
