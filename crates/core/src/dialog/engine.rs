use crate::dialog::states::{
    ConfirmChoice, DialogEvent, DialogPolicy, OutboundAction, TransitionOutcome,
};
use crate::domain::classification::Classification;
use crate::domain::conversation::{DialogContext, Phase};

/// Pure scheduling state machine. Holds no mutable state of its own; every
/// call is `(phase, context, event, classification?) -> outcome` and any
/// pair outside the transition table is a no-op, never an error.
#[derive(Clone, Debug, Default)]
pub struct DialogEngine {
    policy: DialogPolicy,
}

impl DialogEngine {
    pub fn new(policy: DialogPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DialogPolicy {
        &self.policy
    }

    pub fn transition(
        &self,
        phase: Phase,
        context: &DialogContext,
        event: &DialogEvent,
        classification: Option<&Classification>,
    ) -> TransitionOutcome {
        match (phase, event) {
            (
                Phase::NoConversation | Phase::Confirmed | Phase::Canceled,
                DialogEvent::BeginSchedule,
            ) => TransitionOutcome {
                phase: Phase::Initiated,
                context: DialogContext::default(),
                actions: vec![OutboundAction::SendGreeting],
            },
            (
                Phase::Initiated | Phase::AwaitingResponse,
                DialogEvent::DirectMessage { .. },
            ) => match classification {
                Some(result) if result.proposes_time() => self.open_poll(context, result),
                Some(result) => self.clarify(context, result),
                None => TransitionOutcome::no_op(phase, context),
            },
            (Phase::AwaitingConfirmation, DialogEvent::ButtonClick { component_id }) => {
                self.button_click(context, component_id)
            }
            (Phase::Polling, DialogEvent::PollReaction { emoji, added }) => {
                self.poll_reaction(context, emoji, *added)
            }
            _ => TransitionOutcome::no_op(phase, context),
        }
    }

    fn open_poll(&self, context: &DialogContext, result: &Classification) -> TransitionOutcome {
        // proposes_time() guarantees the slots are present.
        let Some(slots) = result.slots.as_ref() else {
            return TransitionOutcome::no_op(Phase::AwaitingResponse, context);
        };

        let mut context = context.clone();
        context.proposed_day = Some(slots.day.clone());
        context.proposed_time = Some(slots.time.clone());
        context.poll_message_id = None;
        context.poll_yes = 0;
        context.poll_no = 0;

        TransitionOutcome {
            phase: Phase::Polling,
            context,
            actions: vec![OutboundAction::PostPoll {
                day: slots.day.clone(),
                time: slots.time.clone(),
            }],
        }
    }

    fn clarify(&self, context: &DialogContext, result: &Classification) -> TransitionOutcome {
        let mut context = context.clone();
        context.clarification_turns += 1;

        if context.clarification_turns >= self.policy.max_clarification_turns {
            let options = self.policy.fallback_times.clone();
            context.offered_times = options.clone();
            return TransitionOutcome {
                phase: Phase::AwaitingConfirmation,
                context,
                actions: vec![OutboundAction::SendTimeOptions { options }],
            };
        }

        TransitionOutcome {
            phase: Phase::AwaitingResponse,
            context,
            actions: vec![OutboundAction::ReplyText(format_classifier_reply(result))],
        }
    }

    fn button_click(&self, context: &DialogContext, component_id: &str) -> TransitionOutcome {
        // Prefix match tested in fixed order; first match wins. Identity is
        // the id alone, label text never participates.
        if component_id.starts_with(ConfirmChoice::Confirm.component_id()) {
            return finalize(context, ConfirmChoice::Confirm);
        }
        if component_id.starts_with(ConfirmChoice::Cancel.component_id()) {
            return finalize(context, ConfirmChoice::Cancel);
        }
        if let Some(value) = component_id.strip_prefix("time_") {
            let mut context = context.clone();
            context.selected_option = Some(value.to_owned());
            let options = context.offered_times.clone();
            return TransitionOutcome {
                phase: Phase::AwaitingConfirmation,
                context,
                actions: vec![
                    OutboundAction::RenderTimeSelection {
                        selected_id: component_id.to_owned(),
                        options,
                    },
                    OutboundAction::ReplyText(format!("Selected {value}")),
                    OutboundAction::SendConfirmationPrompt,
                ],
            };
        }

        TransitionOutcome::no_op(Phase::AwaitingConfirmation, context)
    }

    fn poll_reaction(
        &self,
        context: &DialogContext,
        emoji: &str,
        added: bool,
    ) -> TransitionOutcome {
        let Some(vote) = poll_vote(emoji) else {
            return TransitionOutcome::no_op(Phase::Polling, context);
        };

        let mut context = context.clone();
        let tally = match vote {
            PollVote::Yes => &mut context.poll_yes,
            PollVote::No => &mut context.poll_no,
        };
        *tally = if added { tally.saturating_add(1) } else { tally.saturating_sub(1) };

        if context.poll_yes >= self.policy.poll_quorum {
            context.poll_message_id = None;
            return TransitionOutcome {
                phase: Phase::AwaitingConfirmation,
                context,
                actions: vec![OutboundAction::SendConfirmationPrompt],
            };
        }

        if context.poll_no >= self.policy.poll_quorum {
            let day = context.proposed_day.take().unwrap_or_else(|| "that day".to_owned());
            context.proposed_time = None;
            context.poll_message_id = None;
            context.poll_yes = 0;
            context.poll_no = 0;
            return TransitionOutcome {
                phase: Phase::AwaitingResponse,
                context,
                actions: vec![OutboundAction::ReplyText(format!(
                    "The team can't make {day}. Could you suggest another time?"
                ))],
            };
        }

        TransitionOutcome { phase: Phase::Polling, context, actions: Vec::new() }
    }
}

fn finalize(context: &DialogContext, choice: ConfirmChoice) -> TransitionOutcome {
    let (phase, reply) = match choice {
        ConfirmChoice::Confirm => (Phase::Confirmed, "Confirmed"),
        ConfirmChoice::Cancel => (Phase::Canceled, "Canceled"),
    };
    TransitionOutcome {
        phase,
        context: context.clone(),
        actions: vec![
            OutboundAction::RenderConfirmation { selected: choice },
            OutboundAction::ReplyText(reply.to_owned()),
        ],
    }
}

/// The reply block for a non-time-bearing classification, mirroring the
/// answer/confidence/interpretation layout users already see on mentions.
pub fn format_classifier_reply(result: &Classification) -> String {
    format!(
        "# {}\n- confidence: {:.2}\n- interpreted as: {}",
        result.answer, result.score, result.question
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PollVote {
    Yes,
    No,
}

fn poll_vote(emoji: &str) -> Option<PollVote> {
    match emoji.trim().trim_matches(':').to_ascii_lowercase().as_str() {
        "👍" | "thumbsup" | "+1" => Some(PollVote::Yes),
        "👎" | "thumbsdown" | "-1" => Some(PollVote::No),
        _ => None,
    }
}
