//! Chat Integration - transport boundary and interaction routing
//!
//! This crate provides the chat-platform interface for matchday:
//! - **Events** (`events`) - closed tagged inbound event model
//! - **Widgets** (`widgets`) - pure button-group builders (confirmation
//!   pair, time grid, locked "selected" rendering)
//! - **Commands** (`commands`) - the `/schedule <user>` admin surface
//! - **Router** (`router`) - the only component with transport side
//!   effects: per-user serialization, load → classify → transition →
//!   persist → notify
//! - **Socket** (`socket`) - event pump with reconnection logic
//!
//! # Architecture
//!
//! ```text
//! Platform Events → SocketRunner → InteractionRouter → DialogEngine
//!                                        ↓                  ↓
//!                                 ConversationStore   OutboundActions
//!                                        ↓                  ↓
//!                                    persist ─────────→ ChatApi
//! ```
//!
//! Persist-then-notify: a transition is durable before any reply is
//! visible, so a crash mid-handler can lose a reply but never state.

pub mod api;
pub mod commands;
pub mod events;
pub mod router;
pub mod socket;
pub mod widgets;
