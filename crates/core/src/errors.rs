use thiserror::Error;

use crate::domain::classification::ClassifierError;
use crate::domain::conversation::StoreError;

/// Failure while handling a single inbound event. Caught at the router
/// boundary; one user's failure never touches another user's in-flight
/// task.
#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("event delivery failed: {0}")]
    Transport(String),
}

impl EventError {
    /// User-visible text for failures that warrant a reply. Store and
    /// transport failures stay in the logs; the classifier gets an
    /// apology because the user is mid-sentence and safe to retry.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Classifier(_) => {
                Some("Sorry, I couldn't work that out just now. Mind sending it again?")
            }
            Self::Store(_) | Self::Transport(_) => None,
        }
    }
}
