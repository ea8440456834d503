use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Categorical interpretation of one free-text message, as produced by the
/// external classifier. Unknown tags collapse to `Other` so a model update
/// can add categories without breaking the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Suggestion,
    Request,
    Constraint,
    Confirmation,
    Denial,
    Other,
}

impl Intent {
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "suggestion" => Self::Suggestion,
            "request" => Self::Request,
            "constraint" => Self::Constraint,
            "confirmation" => Self::Confirmation,
            "denial" => Self::Denial,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggestion => "suggestion",
            Self::Request => "request",
            Self::Constraint => "constraint",
            Self::Confirmation => "confirmation",
            Self::Denial => "denial",
            Self::Other => "other",
        }
    }
}

/// Day/time pair extracted from a time-bearing message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlots {
    pub day: String,
    pub time: String,
}

/// Structured result of one classifier invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    /// Confidence in `answer`, 0..=1.
    pub score: f64,
    /// Natural-language reply the classifier composed.
    pub answer: String,
    /// The grammar-corrected reading of the user's message.
    pub question: String,
    pub intent_scores: BTreeMap<String, f64>,
    pub slots: Option<TimeSlots>,
}

impl Classification {
    /// A concrete time proposal the dialog can poll on.
    pub fn proposes_time(&self) -> bool {
        self.intent == Intent::Suggestion && self.slots.is_some()
    }
}

/// Named string arguments for one classifier invocation. Each call site
/// passes the constrained subset its phase needs; the map keeps argument
/// order deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassifyFields(BTreeMap<String, String>);

impl ClassifyFields {
    /// Fields for a direct message: the text plus the dialog phase.
    pub fn direct_message(content: impl Into<String>, state: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("content".to_owned(), content.into());
        fields.insert("state".to_owned(), state.to_owned());
        Self(fields)
    }

    /// Fields for a channel mention: the text only.
    pub fn mention(content: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("content".to_owned(), content.into());
        Self(fields)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classifier process could not be started: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("classifier exited with status {exit_code}: {stderr}")]
    Failure { exit_code: i32, stderr: String },
    #[error("classifier produced malformed output: {0}")]
    Protocol(String),
    #[error("classifier timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },
}

/// Classifier boundary. Invocation may be slow and may fail; callers must
/// treat both as routine and never advance dialog state on failure.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, fields: &ClassifyFields)
        -> Result<Classification, ClassifierError>;
}
