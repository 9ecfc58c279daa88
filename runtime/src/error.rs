//! Orchestrator error types.

use convograph_core::analytics::AnalyticsError;
use convograph_core::broker::BrokerError;
use convograph_core::graph::GraphError;
use std::fmt;
use thiserror::Error;

/// A resource owned by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Conversation analytics client
    AnalyticsClient,
    /// Graph store driver
    Database,
    /// Broker manager
    MessageBus,
    /// Notification coordinator
    Coordinator,
}

impl Resource {
    /// Stable name used in logs and metric labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnalyticsClient => "analytics_client",
            Self::Database => "database",
            Self::MessageBus => "message_bus",
            Self::Coordinator => "coordinator",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by orchestrator operations.
///
/// Construction failures carry the collaborator's own error unchanged.
/// Configuration problems surface earlier, as
/// [`ConfigError`](crate::config::ConfigError) from [`Orchestrator::new`](crate::Orchestrator::new).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The analytics client could not be built
    #[error("Failed to build analytics client: {0}")]
    AnalyticsClient(#[source] AnalyticsError),

    /// The graph driver could not be built
    #[error("Failed to build graph driver: {0}")]
    Database(#[source] GraphError),

    /// The broker manager could not be built
    #[error("Failed to build message bus: {0}")]
    MessageBus(#[source] BrokerError),

    /// The coordinator failed to start or stop consumption
    #[error("Notification coordinator failed: {0}")]
    Coordinator(#[source] BrokerError),
}

impl OrchestratorError {
    /// The resource the error is about.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        match self {
            Self::AnalyticsClient(_) => Resource::AnalyticsClient,
            Self::Database(_) => Resource::Database,
            Self::MessageBus(_) => Resource::MessageBus,
            Self::Coordinator(_) => Resource::Coordinator,
        }
    }
}
