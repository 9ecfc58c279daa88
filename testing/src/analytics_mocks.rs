//! Canned analytics client

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use convograph_core::analytics::{
    AnalyticsError, Conversation, ConversationAnalytics, ConversationMessage,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

/// [`ConversationAnalytics`] backed by in-memory maps.
///
/// Unknown conversation ids yield [`AnalyticsError::NotFound`].
#[derive(Clone, Default)]
pub struct MockAnalyticsClient {
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
    messages: Arc<RwLock<HashMap<String, Vec<ConversationMessage>>>>,
}

impl MockAnalyticsClient {
    /// Create an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `conversation` by its id.
    #[must_use]
    pub fn with_conversation(self, conversation: Conversation) -> Self {
        self.conversations
            .write()
            .unwrap()
            .insert(conversation.id.clone(), conversation);
        self
    }

    /// Serve `messages` for `conversation_id`.
    #[must_use]
    pub fn with_messages(
        self,
        conversation_id: impl Into<String>,
        messages: Vec<ConversationMessage>,
    ) -> Self {
        self.messages
            .write()
            .unwrap()
            .insert(conversation_id.into(), messages);
        self
    }
}

impl ConversationAnalytics for MockAnalyticsClient {
    fn conversation<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Conversation, AnalyticsError>> + Send + 'a>> {
        Box::pin(async move {
            self.conversations
                .read()
                .unwrap()
                .get(conversation_id)
                .cloned()
                .ok_or_else(|| AnalyticsError::NotFound(conversation_id.to_string()))
        })
    }

    fn messages<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ConversationMessage>, AnalyticsError>> + Send + 'a>> {
        Box::pin(async move {
            self.messages
                .read()
                .unwrap()
                .get(conversation_id)
                .cloned()
                .ok_or_else(|| AnalyticsError::NotFound(conversation_id.to_string()))
        })
    }
}
