use std::collections::HashMap;

use async_trait::async_trait;
use matchday_core::{ConversationRecord, ConversationStore, StoreError};
use tokio::sync::Mutex;

/// In-memory store double for router and handler tests.
#[derive(Default)]
pub struct InMemoryConversationStore {
    records: Mutex<HashMap<String, ConversationRecord>>,
    fail_writes: bool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose writes always fail, for exercising the drop-event
    /// path without a real database.
    pub fn failing() -> Self {
        Self { records: Mutex::new(HashMap::new()), fail_writes: true }
    }

    pub async fn snapshot(&self, user_id: &str) -> Option<ConversationRecord> {
        self.records.lock().await.get(user_id).cloned()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find(&self, user_id: &str) -> Result<Option<ConversationRecord>, StoreError> {
        Ok(self.records.lock().await.get(user_id).cloned())
    }

    async fn find_by_poll_message(
        &self,
        message_id: &str,
    ) -> Result<Option<ConversationRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|record| record.context.poll_message_id.as_deref() == Some(message_id))
            .cloned())
    }

    async fn upsert(&self, record: &ConversationRecord) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("in-memory store configured to fail".to_owned()));
        }
        self.records.lock().await.insert(record.user_id.clone(), record.clone());
        Ok(())
    }
}
