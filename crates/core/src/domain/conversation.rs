use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discrete stage of a per-user scheduling dialog.
///
/// `Confirmed` and `Canceled` are resting states for a finished round; a
/// fresh `BeginSchedule` re-enters `Initiated` rather than transitioning
/// out of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NoConversation,
    Initiated,
    AwaitingResponse,
    AwaitingConfirmation,
    Polling,
    Confirmed,
    Canceled,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoConversation => "no_conversation",
            Self::Initiated => "initiated",
            Self::AwaitingResponse => "awaiting_response",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Polling => "polling",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Canceled)
    }

    /// Phases in which an inbound direct message is interpreted through
    /// the classifier rather than ignored.
    pub fn interprets_text(&self) -> bool {
        matches!(self, Self::Initiated | Self::AwaitingResponse)
    }

    pub const ALL: [Phase; 7] = [
        Phase::NoConversation,
        Phase::Initiated,
        Phase::AwaitingResponse,
        Phase::AwaitingConfirmation,
        Phase::Polling,
        Phase::Confirmed,
        Phase::Canceled,
    ];
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown conversation phase `{0}`")]
pub struct PhaseParseError(pub String);

impl FromStr for Phase {
    type Err = PhaseParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "no_conversation" => Ok(Self::NoConversation),
            "initiated" => Ok(Self::Initiated),
            "awaiting_response" => Ok(Self::AwaitingResponse),
            "awaiting_confirmation" => Ok(Self::AwaitingConfirmation),
            "polling" => Ok(Self::Polling),
            "confirmed" => Ok(Self::Confirmed),
            "canceled" => Ok(Self::Canceled),
            other => Err(PhaseParseError(other.to_owned())),
        }
    }
}

/// Auxiliary dialog state accumulated across turns. Persisted alongside
/// the phase as one JSON column; every field defaults so older rows keep
/// decoding as the shape grows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_time: Option<String>,
    /// Time-grid option the user picked via button, e.g. "Tuesday 7pm".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    /// Message id of the live poll while `Polling`; cleared on resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_message_id: Option<String>,
    #[serde(default)]
    pub poll_yes: u32,
    #[serde(default)]
    pub poll_no: u32,
    #[serde(default)]
    pub clarification_turns: u32,
    /// Options last rendered as a time-selection grid, kept so a later
    /// button click can re-render the same grid with a selection applied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offered_times: Vec<String>,
}

/// One scheduling conversation, keyed by the platform user id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationRecord {
    pub user_id: String,
    pub phase: Phase,
    pub context: DialogContext,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    /// The record implied by an absent row: no conversation yet.
    pub fn absent(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            phase: Phase::NoConversation,
            context: DialogContext::default(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("stored record could not be decoded: {0}")]
    Decode(String),
}

/// Persistence boundary for conversation records. One row per user; an
/// upsert must be atomic for that user.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find(&self, user_id: &str) -> Result<Option<ConversationRecord>, StoreError>;
    /// Reverse lookup from a live poll message to the conversation
    /// tracking it. Poll reactions only carry the message id.
    async fn find_by_poll_message(
        &self,
        message_id: &str,
    ) -> Result<Option<ConversationRecord>, StoreError>;
    async fn upsert(&self, record: &ConversationRecord) -> Result<(), StoreError>;
}
