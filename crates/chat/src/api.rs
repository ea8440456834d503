use async_trait::async_trait;
use thiserror::Error;

use crate::widgets::ButtonGroup;

/// Platform-assigned id of a delivered message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("direct message delivery failed: {0}")]
    DirectMessage(String),
    #[error("channel message delivery failed: {0}")]
    Channel(String),
    #[error("message edit failed: {0}")]
    Edit(String),
    #[error("reaction failed: {0}")]
    React(String),
}

/// Outbound transport operations. One shared handle serves all in-flight
/// tasks; implementations must be safe to call concurrently.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_direct_message(
        &self,
        user_id: &str,
        text: &str,
        buttons: Option<&ButtonGroup>,
    ) -> Result<MessageId, TransportError>;

    async fn reply_channel(
        &self,
        channel_id: &str,
        text: &str,
        buttons: Option<&ButtonGroup>,
    ) -> Result<MessageId, TransportError>;

    async fn edit_message(
        &self,
        message_id: &MessageId,
        buttons: &ButtonGroup,
    ) -> Result<(), TransportError>;

    async fn react(&self, message_id: &MessageId, emoji: &str) -> Result<(), TransportError>;
}
