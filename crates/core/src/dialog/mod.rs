pub mod engine;
pub mod states;

pub use engine::{format_classifier_reply, DialogEngine};
pub use states::{ConfirmChoice, DialogEvent, DialogPolicy, OutboundAction, TransitionOutcome};
