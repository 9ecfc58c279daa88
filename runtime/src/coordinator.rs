//! Notification coordinator.
//!
//! Binds one handler per [`Exchange`] to the broker. Each handler receives its
//! own graph session, so categories never share a transaction scope.
//!
//! # Registration
//!
//! ```text
//!            init
//!              │
//!   ┌──────┬───┴──┬──────┬──────┬──────┐   concurrent
//!   ▼      ▼      ▼      ▼      ▼      ▼
//! conv.  entity insight msg.  topic  tracker
//!   │ session → handler → create_subscription
//!   └──────┴───┬──┴──────┴──────┴──────┘
//!              ▼
//!     RegistrationReport (registry order)
//! ```
//!
//! A failure for one exchange never prevents the others from registering.

use crate::handlers;
use crate::report::{RegistrationError, RegistrationReport};
use convograph_core::broker::{BrokerError, BrokerManager, SubscriptionOptions};
use convograph_core::exchange::Exchange;
use convograph_core::graph::{GraphDriver, SessionConfig};
use futures::future::join_all;
use std::sync::Arc;

/// Registers the notification handlers and drives broker consumption.
pub struct NotificationCoordinator {
    driver: Arc<dyn GraphDriver>,
    broker: Arc<dyn BrokerManager>,
    session_config: SessionConfig,
}

impl NotificationCoordinator {
    /// Bind a coordinator to a live driver and broker manager.
    #[must_use]
    pub fn new(driver: Arc<dyn GraphDriver>, broker: Arc<dyn BrokerManager>) -> Self {
        Self {
            driver,
            broker,
            session_config: SessionConfig::default(),
        }
    }

    /// Use `config` for every handler session instead of the default database.
    #[must_use]
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Provision a session and subscription for every exchange.
    ///
    /// All exchanges are attempted concurrently; the report is produced once
    /// every attempt has finished.
    #[tracing::instrument(skip(self), name = "coordinator_init")]
    pub async fn init(&self) -> RegistrationReport {
        let outcomes = join_all(Exchange::ALL.into_iter().map(|exchange| self.register(exchange))).await;

        let mut report = RegistrationReport::default();
        for (exchange, outcome) in Exchange::ALL.into_iter().zip(outcomes) {
            report.record(exchange, outcome);
        }

        tracing::info!(
            registered = report.registered().len(),
            failed = report.failures().len(),
            "Notification handlers registered"
        );
        report
    }

    async fn register(&self, exchange: Exchange) -> Result<(), RegistrationError> {
        let session = match self.driver.session(self.session_config.clone()).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(exchange = %exchange, error = %e, "Session provisioning failed");
                metrics::counter!("coordinator.registration", "exchange" => exchange.name(), "outcome" => "session_failed")
                    .increment(1);
                return Err(e.into());
            },
        };

        let handler = handlers::for_exchange(exchange, session);
        let options = SubscriptionOptions::new(exchange.name(), Arc::clone(&handler));

        if let Err(e) = self.broker.create_subscription(options).await {
            tracing::warn!(exchange = %exchange, error = %e, "Subscription failed");
            metrics::counter!("coordinator.registration", "exchange" => exchange.name(), "outcome" => "subscription_failed")
                .increment(1);
            // The broker never took ownership of the handler.
            if let Err(release_err) = handler.release().await {
                tracing::warn!(exchange = %exchange, error = %release_err, "Failed to release orphaned handler");
            }
            return Err(e.into());
        }

        metrics::counter!("coordinator.registration", "exchange" => exchange.name(), "outcome" => "registered")
            .increment(1);
        tracing::debug!(exchange = %exchange, "Handler registered");
        Ok(())
    }

    /// Begin consumption on every registered subscription.
    ///
    /// # Errors
    ///
    /// Returns the broker's error unchanged.
    pub async fn start(&self) -> Result<(), BrokerError> {
        self.broker.start().await.inspect_err(|e| {
            tracing::error!(error = %e, "Broker start failed");
        })?;
        tracing::info!("Notification consumption started");
        Ok(())
    }

    /// Halt consumption. Subscriptions stay registered.
    ///
    /// # Errors
    ///
    /// Returns the broker's error unchanged.
    pub async fn stop(&self) -> Result<(), BrokerError> {
        self.broker.stop().await.inspect_err(|e| {
            tracing::error!(error = %e, "Broker stop failed");
        })?;
        tracing::info!("Notification consumption stopped");
        Ok(())
    }

    /// Delete every subscription, releasing the handlers and their sessions.
    ///
    /// # Errors
    ///
    /// Returns the broker's error unchanged.
    pub async fn teardown(&self) -> Result<(), BrokerError> {
        self.broker.delete_all().await.inspect_err(|e| {
            tracing::error!(error = %e, "Subscription teardown failed");
        })?;
        tracing::info!("Notification subscriptions deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use convograph_testing::{MockBrokerManager, MockGraphDriver};

    fn coordinator(driver: &MockGraphDriver, broker: &MockBrokerManager) -> NotificationCoordinator {
        NotificationCoordinator::new(Arc::new(driver.clone()), Arc::new(broker.clone()))
    }

    #[tokio::test]
    async fn init_registers_every_exchange() {
        let driver = MockGraphDriver::new();
        let broker = MockBrokerManager::new();

        let report = coordinator(&driver, &broker).init().await;

        assert!(report.is_complete());
        assert_eq!(report.registered(), &Exchange::ALL);
        assert_eq!(broker.subscription_names().len(), 6);
        assert_eq!(driver.sessions_opened(), 6);
    }

    #[tokio::test]
    async fn failed_subscription_releases_its_session() {
        let driver = MockGraphDriver::new();
        let broker = MockBrokerManager::new();
        broker.fail_subscription("entity");

        let report = coordinator(&driver, &broker).init().await;

        assert_eq!(report.registered().len(), 5);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].exchange, Exchange::Entity);
        assert!(matches!(report.failures()[0].error, RegistrationError::Subscription(_)));
        assert_eq!(driver.open_sessions(), 5);
    }

    #[tokio::test]
    async fn session_failures_are_reported_per_exchange() {
        let driver = MockGraphDriver::new();
        driver.fail_sessions(true);
        let broker = MockBrokerManager::new();

        let report = coordinator(&driver, &broker).init().await;

        assert!(report.registered().is_empty());
        assert_eq!(report.failures().len(), 6);
        assert!(broker.subscribe_attempts().is_empty());
    }

    #[tokio::test]
    async fn teardown_releases_sessions() {
        let driver = MockGraphDriver::new();
        let broker = MockBrokerManager::new();
        let coordinator = coordinator(&driver, &broker);

        coordinator.init().await;
        coordinator.start().await.unwrap();
        coordinator.stop().await.unwrap();
        coordinator.teardown().await.unwrap();

        assert!(broker.subscription_names().is_empty());
        assert_eq!(driver.open_sessions(), 0);
    }

    #[tokio::test]
    async fn custom_session_config_is_used() {
        let driver = MockGraphDriver::new();
        let broker = MockBrokerManager::new();
        let coordinator = coordinator(&driver, &broker).with_session_config(SessionConfig::new("analytics"));

        coordinator.init().await;
        coordinator.start().await.unwrap();
        broker
            .deliver("conversation", br#"{"conversationId":"conv-1"}"#)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(driver.statements()[0].database, "analytics");
    }
}
