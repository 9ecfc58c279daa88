//! Construction seam for the orchestrator's external resources.
//!
//! The orchestrator never names a concrete driver, broker or client. It asks a
//! [`ResourceFactory`] for a fresh one whenever a handle has to be (re)built,
//! which keeps rebuild ordering and teardown logic testable against the
//! in-memory factory in `convograph-testing`.

use crate::analytics::{AnalyticsError, ConversationAnalytics};
use crate::broker::{BrokerError, BrokerManager};
use crate::graph::{BasicAuth, GraphDriver, GraphError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Builds the three long-lived resources owned by the orchestrator.
///
/// Every call must return a new, independent resource; the orchestrator takes
/// exclusive ownership of it.
pub trait ResourceFactory: Send + Sync {
    /// Build a ready analytics client.
    ///
    /// # Errors
    ///
    /// Returns the client's own construction error.
    fn analytics_client(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn ConversationAnalytics>, AnalyticsError>> + Send + '_>>;

    /// Build a graph driver for `uri` using basic authentication.
    ///
    /// # Errors
    ///
    /// Returns the driver's construction error.
    fn graph_driver<'a>(
        &'a self,
        uri: &'a str,
        auth: BasicAuth,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn GraphDriver>, GraphError>> + Send + 'a>>;

    /// Build a broker manager connected to `uri`.
    ///
    /// # Errors
    ///
    /// Returns the manager's construction error.
    fn broker_manager<'a>(
        &'a self,
        uri: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerManager>, BrokerError>> + Send + 'a>>;
}
