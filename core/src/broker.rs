//! Message broker abstraction for exchange subscriptions.
//!
//! This module provides the [`BrokerManager`] trait for binding message
//! handlers to named exchanges, and the [`MessageHandler`] trait those
//! handlers implement.
//!
//! # Subscription Lifecycle
//!
//! ```text
//! create_subscription ──► start ──► stop ──► start ──► ...
//!         │                                   │
//!         └──────────────► delete_all ◄───────┘
//!                              │
//!                              ▼
//!                          teardown
//! ```
//!
//! - `create_subscription` binds an exchange to a handler but delivers nothing yet
//! - `start` begins consumption for every subscription
//! - `stop` halts consumption, subscriptions stay registered
//! - `delete_all` removes every subscription and releases its handler
//! - `teardown` deletes everything and closes the underlying connection
//!
//! # Implementations
//!
//! - `RabbitBrokerManager` (in `convograph-rabbitmq`): Production AMQP implementation
//! - `MockBrokerManager` (in `convograph-testing`): In-memory, with scripted failures

use crate::graph::GraphError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Failed to connect to the broker
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A subscription with this name is already registered
    #[error("Subscription already exists: {0}")]
    SubscriptionExists(String),

    /// Failed to create the subscription
    #[error("Subscription failed for exchange '{exchange}': {reason}")]
    SubscriptionFailed {
        /// The exchange that failed
        exchange: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to start or stop consumption
    #[error("Consumer error for exchange '{exchange}': {reason}")]
    ConsumerFailed {
        /// The exchange whose consumer failed
        exchange: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to delete a subscription
    #[error("Delete failed for exchange '{exchange}': {reason}")]
    DeleteFailed {
        /// The exchange that failed
        exchange: String,
        /// The reason for failure
        reason: String,
    },

    /// The manager has been torn down
    #[error("Broker manager is closed")]
    Closed,

    /// Generic error for other failures
    #[error("Broker error: {0}")]
    Other(String),
}

/// Errors returned by message handlers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The payload could not be decoded
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The graph write failed
    #[error("Graph write failed: {0}")]
    Graph(#[from] GraphError),
}

/// Consumer of messages delivered from one exchange.
///
/// Each handler is bound to exactly one subscription and owns whatever
/// resources it needs to process messages (typically a graph session).
///
/// # Error Handling
///
/// A failed `handle` rejects that one message; the subscription keeps
/// consuming subsequent messages.
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle a raw message body.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] if the payload cannot be decoded or persisted.
    fn handle<'a>(
        &'a self,
        data: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + 'a>>;

    /// Release resources held by the handler.
    ///
    /// Called by the broker manager when the owning subscription is deleted.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] if a held resource fails to close.
    fn release(&self) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send + '_>>;
}

/// Parameters for [`BrokerManager::create_subscription`].
#[derive(Clone)]
pub struct SubscriptionOptions {
    /// Exchange name (also the subscription's unique name)
    pub name: String,
    /// Handler that receives every message from the exchange
    pub handler: Arc<dyn MessageHandler>,
}

impl SubscriptionOptions {
    /// Bind `handler` to the exchange `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl std::fmt::Debug for SubscriptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionOptions")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Subscription management over named exchanges.
///
/// # Thread Safety
///
/// Implementations must tolerate concurrent `create_subscription` calls; the
/// notification coordinator registers all handlers at once.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn BrokerManager>`).
pub trait BrokerManager: Send + Sync {
    /// Register a subscription binding an exchange to a handler.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists`: a subscription with the same name is registered
    /// - `SubscriptionFailed`: the broker rejected the declaration
    /// - `Closed`: the manager was torn down
    fn create_subscription(
        &self,
        options: SubscriptionOptions,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Begin consuming on every registered subscription.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConsumerFailed`] if a consumer cannot be started.
    fn start(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Halt consumption. Subscriptions remain registered.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConsumerFailed`] if a consumer cannot be cancelled.
    fn stop(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Remove every subscription and release its handler.
    ///
    /// # Errors
    ///
    /// Returns the first [`BrokerError::DeleteFailed`] encountered; the
    /// remaining subscriptions are still deleted.
    fn delete_all(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Delete every subscription and close the broker connection.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered while cleaning up.
    fn teardown(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;
}
