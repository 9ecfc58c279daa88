//! Scriptable resource factory
//!
//! [`MockResources`] hands out [`MockGraphDriver`]s, [`MockBrokerManager`]s and
//! [`MockAnalyticsClient`]s, keeps a handle to every resource it built, and
//! logs the order in which resources were requested.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a test panic

use crate::analytics_mocks::MockAnalyticsClient;
use crate::broker_mocks::MockBrokerManager;
use crate::graph_mocks::MockGraphDriver;
use convograph_core::analytics::{AnalyticsError, ConversationAnalytics};
use convograph_core::broker::{BrokerError, BrokerManager};
use convograph_core::graph::{BasicAuth, GraphDriver, GraphError};
use convograph_core::resources::ResourceFactory;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Which resource a factory call built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// Analytics client
    Analytics,
    /// Graph driver
    Graph,
    /// Broker manager
    Broker,
}

#[derive(Default)]
struct FactoryState {
    fail_analytics: AtomicBool,
    fail_graph: AtomicBool,
    fail_broker: AtomicBool,
    fail_sessions: AtomicBool,
    failing_exchanges: Mutex<Vec<String>>,
    calls: Mutex<Vec<ResourceKind>>,
    graph_targets: Mutex<Vec<(String, BasicAuth)>>,
    broker_targets: Mutex<Vec<String>>,
    drivers: Mutex<Vec<MockGraphDriver>>,
    brokers: Mutex<Vec<MockBrokerManager>>,
}

/// In-memory [`ResourceFactory`] for orchestrator tests.
///
/// Clones share state, so a test can keep one clone for assertions after
/// handing another to the orchestrator.
///
/// # Example
///
/// ```
/// use convograph_testing::{MockResources, ResourceKind};
///
/// let resources = MockResources::new();
/// resources.fail(ResourceKind::Graph, true);
/// assert!(resources.calls().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct MockResources {
    state: Arc<FactoryState>,
}

impl MockResources {
    /// Create a factory whose resources all succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make construction of `kind` fail (or succeed again).
    pub fn fail(&self, kind: ResourceKind, fail: bool) {
        let flag = match kind {
            ResourceKind::Analytics => &self.state.fail_analytics,
            ResourceKind::Graph => &self.state.fail_graph,
            ResourceKind::Broker => &self.state.fail_broker,
        };
        flag.store(fail, Ordering::SeqCst);
    }

    /// Drivers built from now on refuse to open sessions.
    pub fn fail_sessions(&self, fail: bool) {
        self.state.fail_sessions.store(fail, Ordering::SeqCst);
    }

    /// Brokers built from now on reject subscriptions to `exchange`.
    pub fn fail_subscription(&self, exchange: impl Into<String>) {
        self.state
            .failing_exchanges
            .lock()
            .unwrap()
            .push(exchange.into());
    }

    /// Every construction attempt, in order, including failed ones.
    #[must_use]
    pub fn calls(&self) -> Vec<ResourceKind> {
        self.state.calls.lock().unwrap().clone()
    }

    /// Number of construction attempts for `kind`.
    #[must_use]
    pub fn attempts(&self, kind: ResourceKind) -> usize {
        self.calls().into_iter().filter(|call| *call == kind).count()
    }

    /// Connection strings and credentials passed to `graph_driver`.
    #[must_use]
    pub fn graph_targets(&self) -> Vec<(String, BasicAuth)> {
        self.state.graph_targets.lock().unwrap().clone()
    }

    /// Connection strings passed to `broker_manager`.
    #[must_use]
    pub fn broker_targets(&self) -> Vec<String> {
        self.state.broker_targets.lock().unwrap().clone()
    }

    /// Every driver built so far, oldest first.
    #[must_use]
    pub fn drivers(&self) -> Vec<MockGraphDriver> {
        self.state.drivers.lock().unwrap().clone()
    }

    /// Every broker built so far, oldest first.
    #[must_use]
    pub fn brokers(&self) -> Vec<MockBrokerManager> {
        self.state.brokers.lock().unwrap().clone()
    }

    /// The most recently built driver.
    #[must_use]
    pub fn latest_driver(&self) -> Option<MockGraphDriver> {
        self.state.drivers.lock().unwrap().last().cloned()
    }

    /// The most recently built broker.
    #[must_use]
    pub fn latest_broker(&self) -> Option<MockBrokerManager> {
        self.state.brokers.lock().unwrap().last().cloned()
    }

    fn record(&self, kind: ResourceKind) -> bool {
        self.state.calls.lock().unwrap().push(kind);
        let flag = match kind {
            ResourceKind::Analytics => &self.state.fail_analytics,
            ResourceKind::Graph => &self.state.fail_graph,
            ResourceKind::Broker => &self.state.fail_broker,
        };
        flag.load(Ordering::SeqCst)
    }
}

impl ResourceFactory for MockResources {
    fn analytics_client(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn ConversationAnalytics>, AnalyticsError>> + Send + '_>>
    {
        Box::pin(async move {
            if self.record(ResourceKind::Analytics) {
                return Err(AnalyticsError::Unauthorized);
            }
            Ok(Arc::new(MockAnalyticsClient::new()) as Arc<dyn ConversationAnalytics>)
        })
    }

    fn graph_driver<'a>(
        &'a self,
        uri: &'a str,
        auth: BasicAuth,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn GraphDriver>, GraphError>> + Send + 'a>> {
        Box::pin(async move {
            self.state
                .graph_targets
                .lock()
                .unwrap()
                .push((uri.to_string(), auth));
            if self.record(ResourceKind::Graph) {
                return Err(GraphError::ConnectionFailed(format!("scripted failure for {uri}")));
            }

            let driver = MockGraphDriver::new();
            driver.fail_sessions(self.state.fail_sessions.load(Ordering::SeqCst));
            self.state.drivers.lock().unwrap().push(driver.clone());
            Ok(Arc::new(driver) as Arc<dyn GraphDriver>)
        })
    }

    fn broker_manager<'a>(
        &'a self,
        uri: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn BrokerManager>, BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            self.state
                .broker_targets
                .lock()
                .unwrap()
                .push(uri.to_string());
            if self.record(ResourceKind::Broker) {
                return Err(BrokerError::ConnectionFailed(format!("scripted failure for {uri}")));
            }

            let broker = MockBrokerManager::new();
            for exchange in self.state.failing_exchanges.lock().unwrap().iter() {
                broker.fail_subscription(exchange.clone());
            }
            self.state.brokers.lock().unwrap().push(broker.clone());
            Ok(Arc::new(broker) as Arc<dyn BrokerManager>)
        })
    }
}
