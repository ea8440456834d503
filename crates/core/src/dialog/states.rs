use serde::{Deserialize, Serialize};

use crate::domain::conversation::{DialogContext, Phase};

/// Tunables the state machine needs beyond the persisted context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogPolicy {
    /// Reactions on one side of the poll needed to resolve it.
    pub poll_quorum: u32,
    /// Clarification replies tolerated before escalating to buttons.
    pub max_clarification_turns: u32,
    /// Options offered when the dialog escalates to a time grid.
    pub fallback_times: Vec<String>,
}

impl Default for DialogPolicy {
    fn default() -> Self {
        Self {
            poll_quorum: 3,
            max_clarification_turns: 3,
            fallback_times: vec![
                "Tuesday 7pm".to_owned(),
                "Wednesday 5pm".to_owned(),
                "Friday 9pm".to_owned(),
            ],
        }
    }
}

/// Inbound occurrence the state machine can react to, already resolved to
/// the acting user by the router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogEvent {
    /// Admin asked the bot to open (or reopen) scheduling with this user.
    BeginSchedule,
    DirectMessage { text: String },
    ButtonClick { component_id: String },
    /// Reaction change on the tracked poll message.
    PollReaction { emoji: String, added: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmChoice {
    Confirm,
    Cancel,
}

impl ConfirmChoice {
    pub fn component_id(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        }
    }
}

/// Side effect the router must perform after persisting a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboundAction {
    /// DM the configured greeting to open the conversation.
    SendGreeting,
    /// DM plain text to the conversation partner.
    ReplyText(String),
    /// Post "How about {day} at {time}?" to the scheduling channel with
    /// 👍/👎 seed reactions.
    PostPoll { day: String, time: String },
    /// DM a time-selection button grid.
    SendTimeOptions { options: Vec<String> },
    /// DM a confirm/cancel button pair for the agreed slot.
    SendConfirmationPrompt,
    /// Lock the clicked confirmation group with one side selected.
    RenderConfirmation { selected: ConfirmChoice },
    /// Lock the clicked time grid with the chosen option selected.
    RenderTimeSelection { selected_id: String, options: Vec<String> },
}

/// Result of one transition: the phase and context to persist plus the
/// actions to execute. An undefined (phase, event) pair yields the input
/// phase/context untouched and no actions.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionOutcome {
    pub phase: Phase,
    pub context: DialogContext,
    pub actions: Vec<OutboundAction>,
}

impl TransitionOutcome {
    pub fn no_op(phase: Phase, context: &DialogContext) -> Self {
        Self { phase, context: context.clone(), actions: Vec::new() }
    }

    pub fn is_no_op(&self, phase: Phase, context: &DialogContext) -> bool {
        self.actions.is_empty() && self.phase == phase && &self.context == context
    }
}
