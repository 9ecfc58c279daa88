//! Notification handlers.
//!
//! One handler per [`Exchange`]. Every notification is a JSON object carrying
//! at least a `conversationId`; the handler attaches it to the conversation's
//! node with a category-specific Cypher statement. The raw notification is
//! stored as a JSON string property so no schema is imposed on it.

use chrono::Utc;
use convograph_core::broker::{HandlerError, MessageHandler};
use convograph_core::exchange::Exchange;
use convograph_core::graph::{GraphSession, Statement};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

const CONVERSATION_CYPHER: &str = "\
MERGE (c:Conversation {conversationId: $conversation_id}) \
SET c.payload = $payload, c.updatedAt = $received_at";

const ENTITY_CYPHER: &str = "\
MERGE (c:Conversation {conversationId: $conversation_id}) \
CREATE (n:Entity {payload: $payload, receivedAt: $received_at})-[:MENTIONED_IN]->(c)";

const INSIGHT_CYPHER: &str = "\
MERGE (c:Conversation {conversationId: $conversation_id}) \
CREATE (n:Insight {payload: $payload, receivedAt: $received_at})-[:INSIGHT_OF]->(c)";

const MESSAGE_CYPHER: &str = "\
MERGE (c:Conversation {conversationId: $conversation_id}) \
CREATE (n:Message {payload: $payload, receivedAt: $received_at})-[:SPOKEN_IN]->(c)";

const TOPIC_CYPHER: &str = "\
MERGE (c:Conversation {conversationId: $conversation_id}) \
CREATE (n:Topic {payload: $payload, receivedAt: $received_at})-[:DISCUSSED_IN]->(c)";

const TRACKER_CYPHER: &str = "\
MERGE (c:Conversation {conversationId: $conversation_id}) \
CREATE (n:Tracker {payload: $payload, receivedAt: $received_at})-[:DETECTED_IN]->(c)";

/// Build the handler for `exchange`, taking ownership of `session`.
#[must_use]
pub fn for_exchange(exchange: Exchange, session: Box<dyn GraphSession>) -> Arc<dyn MessageHandler> {
    let cypher = match exchange {
        Exchange::Conversation => CONVERSATION_CYPHER,
        Exchange::Entity => ENTITY_CYPHER,
        Exchange::Insight => INSIGHT_CYPHER,
        Exchange::Message => MESSAGE_CYPHER,
        Exchange::Topic => TOPIC_CYPHER,
        Exchange::Tracker => TRACKER_CYPHER,
    };
    Arc::new(NotificationHandler {
        exchange,
        cypher,
        session,
    })
}

/// Persists notifications from one exchange through a dedicated session.
pub struct NotificationHandler {
    exchange: Exchange,
    cypher: &'static str,
    session: Box<dyn GraphSession>,
}

impl NotificationHandler {
    /// Exchange this handler consumes.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn statement(&self, data: &[u8]) -> Result<Statement, HandlerError> {
        let notification: Value = serde_json::from_slice(data)
            .map_err(|e| HandlerError::Decode(format!("invalid JSON: {e}")))?;

        let conversation_id = notification
            .get("conversationId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| HandlerError::Decode("missing conversationId".to_string()))?
            .to_string();

        Ok(Statement::new(self.cypher)
            .param("conversation_id", conversation_id)
            .param("payload", notification.to_string())
            .param("received_at", Utc::now().to_rfc3339()))
    }
}

impl MessageHandler for NotificationHandler {
    fn handle<'a>(
        &'a self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
        Box::pin(async move {
            let statement = match self.statement(data) {
                Ok(statement) => statement,
                Err(e) => {
                    tracing::warn!(exchange = %self.exchange, error = %e, "Dropping undecodable notification");
                    return Err(e);
                },
            };

            self.session.run(statement).await?;
            tracing::trace!(exchange = %self.exchange, "Notification persisted");
            Ok(())
        })
    }

    fn release(&self) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + '_>> {
        Box::pin(async move {
            self.session.close().await?;
            tracing::debug!(exchange = %self.exchange, "Handler session released");
            Ok(())
        })
    }
}
