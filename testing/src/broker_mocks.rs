//! In-memory broker manager
//!
//! [`MockBrokerManager`] keeps subscriptions in a map, can be scripted to
//! reject particular exchanges, and lets tests push payloads straight into a
//! subscribed handler with [`MockBrokerManager::deliver`].

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a test panic

use convograph_core::broker::{
    BrokerError, BrokerManager, HandlerError, MessageHandler, SubscriptionOptions,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct BrokerState {
    subscriptions: Mutex<HashMap<String, Arc<dyn MessageHandler>>>,
    failing_exchanges: Mutex<HashSet<String>>,
    subscribe_attempts: Mutex<Vec<String>>,
    started: AtomicBool,
    closed: AtomicBool,
    fail_teardown: AtomicBool,
    fail_start: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    teardown_calls: AtomicUsize,
}

/// In-memory [`BrokerManager`] for tests.
///
/// Clones share state.
///
/// # Example
///
/// ```
/// use convograph_testing::MockBrokerManager;
///
/// let broker = MockBrokerManager::new();
/// broker.fail_subscription("entity");
/// assert!(broker.subscription_names().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct MockBrokerManager {
    state: Arc<BrokerState>,
}

impl MockBrokerManager {
    /// Create a broker that accepts every subscription.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject future subscriptions to `exchange` with `SubscriptionFailed`.
    pub fn fail_subscription(&self, exchange: impl Into<String>) {
        self.state
            .failing_exchanges
            .lock()
            .unwrap()
            .insert(exchange.into());
    }

    /// Make `teardown` report an error after it has cleaned up.
    pub fn fail_teardown(&self, fail: bool) {
        self.state.fail_teardown.store(fail, Ordering::SeqCst);
    }

    /// Make `start` fail with `ConsumerFailed` without starting consumption.
    pub fn fail_start(&self, fail: bool) {
        self.state.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Registered subscription names, sorted.
    #[must_use]
    pub fn subscription_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .subscriptions
            .lock()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Every `create_subscription` name seen, including rejected ones.
    #[must_use]
    pub fn subscribe_attempts(&self) -> Vec<String> {
        self.state.subscribe_attempts.lock().unwrap().clone()
    }

    /// Whether consumption is running.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state.started.load(Ordering::SeqCst)
    }

    /// Whether `teardown` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Number of `start` calls.
    #[must_use]
    pub fn start_calls(&self) -> usize {
        self.state.start_calls.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.state.stop_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete_all` calls.
    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.state.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of `teardown` calls.
    #[must_use]
    pub fn teardown_calls(&self) -> usize {
        self.state.teardown_calls.load(Ordering::SeqCst)
    }

    /// Whether two handles share the same underlying broker.
    #[must_use]
    pub fn same_broker(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Hand `data` to the handler subscribed to `exchange`.
    ///
    /// Returns `None` when there is no such subscription or consumption is
    /// not running, mirroring a broker that holds the message back.
    pub async fn deliver(&self, exchange: &str, data: &[u8]) -> Option<Result<(), HandlerError>> {
        if !self.is_started() {
            return None;
        }
        let handler = self.state.subscriptions.lock().unwrap().get(exchange).cloned()?;
        Some(handler.handle(data).await)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.is_closed() {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }

    async fn release_all(&self) -> Result<(), BrokerError> {
        let drained: Vec<(String, Arc<dyn MessageHandler>)> =
            self.state.subscriptions.lock().unwrap().drain().collect();
        self.state.started.store(false, Ordering::SeqCst);

        let mut first_error = None;
        for (exchange, handler) in drained {
            if let Err(e) = handler.release().await {
                first_error.get_or_insert(BrokerError::DeleteFailed {
                    exchange,
                    reason: e.to_string(),
                });
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl BrokerManager for MockBrokerManager {
    fn create_subscription(
        &self,
        options: SubscriptionOptions,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_open()?;
            let SubscriptionOptions { name, handler } = options;
            self.state
                .subscribe_attempts
                .lock()
                .unwrap()
                .push(name.clone());

            if self.state.failing_exchanges.lock().unwrap().contains(&name) {
                return Err(BrokerError::SubscriptionFailed {
                    exchange: name,
                    reason: "scripted subscription failure".to_string(),
                });
            }

            let mut subscriptions = self.state.subscriptions.lock().unwrap();
            if subscriptions.contains_key(&name) {
                return Err(BrokerError::SubscriptionExists(name));
            }
            subscriptions.insert(name, handler);
            Ok(())
        })
    }

    fn start(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.state.start_calls.fetch_add(1, Ordering::SeqCst);
            if self.state.fail_start.load(Ordering::SeqCst) {
                return Err(BrokerError::ConsumerFailed {
                    exchange: "*".to_string(),
                    reason: "scripted start failure".to_string(),
                });
            }
            self.state.started.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.state.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.state.started.store(false, Ordering::SeqCst);
            Ok(())
        })
    }

    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        Box::pin(async move {
            self.ensure_open()?;
            self.state.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.release_all().await
        })
    }

    fn teardown(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        Box::pin(async move {
            self.state.teardown_calls.fetch_add(1, Ordering::SeqCst);
            if self.state.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }

            let released = self.release_all().await;
            if self.state.fail_teardown.load(Ordering::SeqCst) {
                return Err(BrokerError::Other("scripted teardown failure".to_string()));
            }
            released
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    impl MessageHandler for NoopHandler {
        fn handle<'a>(
            &'a self,
            _data: &'a [u8],
        ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }

        fn release(&self) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + '_>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let broker = MockBrokerManager::new();
        broker
            .create_subscription(SubscriptionOptions::new("topic", Arc::new(NoopHandler)))
            .await
            .unwrap();

        let result = broker
            .create_subscription(SubscriptionOptions::new("topic", Arc::new(NoopHandler)))
            .await;

        assert_eq!(result, Err(BrokerError::SubscriptionExists("topic".to_string())));
        assert_eq!(broker.subscribe_attempts().len(), 2);
    }

    #[tokio::test]
    async fn deliver_requires_start() {
        let broker = MockBrokerManager::new();
        broker
            .create_subscription(SubscriptionOptions::new("topic", Arc::new(NoopHandler)))
            .await
            .unwrap();

        assert!(broker.deliver("topic", b"{}").await.is_none());
        broker.start().await.unwrap();
        assert_eq!(broker.deliver("topic", b"{}").await, Some(Ok(())));
    }

    #[tokio::test]
    async fn scripted_start_failure_keeps_consumption_off() {
        let broker = MockBrokerManager::new();
        broker.fail_start(true);

        assert!(matches!(broker.start().await, Err(BrokerError::ConsumerFailed { .. })));
        assert!(!broker.is_started());
        assert_eq!(broker.start_calls(), 1);
    }

    #[tokio::test]
    async fn teardown_closes_once() {
        let broker = MockBrokerManager::new();
        broker.teardown().await.unwrap();
        broker.teardown().await.unwrap();

        assert!(broker.is_closed());
        assert_eq!(broker.teardown_calls(), 2);
        assert_eq!(broker.start().await, Err(BrokerError::Closed));
    }
}
