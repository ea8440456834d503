//! Classifier Gateway - external intent classification
//!
//! This crate wraps the out-of-process intent classifier behind the
//! `IntentClassifier` trait from `matchday-core`:
//! - **Protocol** (`protocol`) - the structured JSON result (flat shape,
//!   protocol v1) and its mapping into the domain `Classification`
//! - **Gateway** (`gateway`) - subprocess invocation with `--name=value`
//!   argument framing, captured diagnostics, and an enforced timeout
//!
//! The gateway never interprets the classification; it only frames the
//! request, parses the reply, and turns every failure mode into a typed
//! `ClassifierError` the router can report without advancing state.

pub mod gateway;
pub mod protocol;

pub use gateway::SubprocessClassifier;
