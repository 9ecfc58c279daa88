//! Production resource factory.

use convograph_analytics::AnalyticsClient;
use convograph_core::analytics::{AnalyticsError, ConversationAnalytics};
use convograph_core::broker::{BrokerError, BrokerManager};
use convograph_core::graph::{BasicAuth, GraphDriver, GraphError};
use convograph_core::resources::ResourceFactory;
use convograph_neo4j::Neo4jDriver;
use convograph_rabbitmq::RabbitBrokerManager;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Builds the analytics REST client, the Neo4j driver and the RabbitMQ
/// broker manager.
#[derive(Debug, Clone)]
pub struct LiveResources {
    connection_name: String,
    prefetch: u16,
}

impl LiveResources {
    /// Name the broker connection (also prefixes consumer tags).
    #[must_use]
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = name.into();
        self
    }

    /// Set the per-consumer prefetch count.
    #[must_use]
    pub const fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }
}

impl Default for LiveResources {
    fn default() -> Self {
        Self {
            connection_name: convograph_rabbitmq::DEFAULT_CONNECTION_NAME.to_string(),
            prefetch: convograph_rabbitmq::DEFAULT_PREFETCH,
        }
    }
}

impl ResourceFactory for LiveResources {
    fn analytics_client(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn ConversationAnalytics>, AnalyticsError>> + Send + '_>>
    {
        Box::pin(async move {
            let client = AnalyticsClient::from_env().await?;
            Ok(Arc::new(client) as Arc<dyn ConversationAnalytics>)
        })
    }

    fn graph_driver<'a>(
        &'a self,
        uri: &'a str,
        auth: BasicAuth,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn GraphDriver>, GraphError>> + Send + 'a>> {
        Box::pin(async move {
            let driver = Neo4jDriver::new(uri, auth)?;
            match driver.verify_connectivity().await {
                Ok(()) => {},
                Err(e @ GraphError::Unauthorized(_)) => return Err(e),
                Err(e) => tracing::warn!(error = %e, "Graph store not reachable yet"),
            }
            Ok(Arc::new(driver) as Arc<dyn GraphDriver>)
        })
    }

    fn broker_manager<'a>(
        &'a self,
        uri: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerManager>, BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            let broker = RabbitBrokerManager::builder()
                .uri(uri)
                .connection_name(self.connection_name.clone())
                .prefetch(self.prefetch)
                .connect()
                .await?;
            Ok(Arc::new(broker) as Arc<dyn BrokerManager>)
        })
    }
}
