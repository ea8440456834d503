//! Matchday Core - conversation state machine and boundary contracts
//!
//! This crate holds everything that must stay pure and platform-agnostic:
//! - **Domain** (`domain`) - conversation records, classifier results, the
//!   store/classifier boundary traits
//! - **Dialog** (`dialog`) - the scheduling state machine: phase + event
//!   (+ optional classification) -> next phase, context, outbound actions
//! - **Config** (`config`) - layered configuration (file, env, overrides)
//! - **Errors** (`errors`) - per-event failure taxonomy with user-safe text
//!
//! # Key Types
//!
//! - `Phase` / `DialogContext` / `ConversationRecord` - persisted state
//! - `DialogEngine` - pure transition logic (no I/O, no clocks)
//! - `IntentClassifier` / `ConversationStore` - collaborator seams the
//!   gateway and repository crates implement
//!
//! # Design Principle
//!
//! The state machine never touches the transport, the database, or the
//! classifier process. It is handed a classification when one is relevant
//! and answers with data; the interaction router owns every side effect.

pub mod config;
pub mod dialog;
pub mod domain;
pub mod errors;

pub use dialog::engine::DialogEngine;
pub use dialog::states::{
    ConfirmChoice, DialogEvent, DialogPolicy, OutboundAction, TransitionOutcome,
};
pub use domain::classification::{
    Classification, ClassifierError, ClassifyFields, Intent, IntentClassifier, TimeSlots,
};
pub use domain::conversation::{
    ConversationRecord, ConversationStore, DialogContext, Phase, PhaseParseError, StoreError,
};
pub use errors::EventError;

pub use chrono;
