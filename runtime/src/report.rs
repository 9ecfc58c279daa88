//! Outcomes of best-effort operations.
//!
//! Registration and shutdown never fail as a whole. Per-step failures are
//! logged where they happen and collected here so callers can inspect them.

use crate::error::Resource;
use convograph_core::broker::BrokerError;
use convograph_core::exchange::Exchange;
use convograph_core::graph::GraphError;
use thiserror::Error;

/// Why one exchange could not be registered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// No session could be provisioned for the handler
    #[error("session provisioning failed: {0}")]
    Session(#[from] GraphError),

    /// The broker rejected the subscription
    #[error("subscription failed: {0}")]
    Subscription(#[from] BrokerError),
}

/// A registration failure for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFailure {
    /// The exchange that was not registered
    pub exchange: Exchange,
    /// What went wrong
    pub error: RegistrationError,
}

/// Result of registering every handler with the broker.
///
/// Both lists follow registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    registered: Vec<Exchange>,
    failures: Vec<RegistrationFailure>,
}

impl RegistrationReport {
    pub(crate) fn record(&mut self, exchange: Exchange, outcome: Result<(), RegistrationError>) {
        match outcome {
            Ok(()) => self.registered.push(exchange),
            Err(error) => self.failures.push(RegistrationFailure { exchange, error }),
        }
    }

    /// Exchanges with a live subscription.
    #[must_use]
    pub fn registered(&self) -> &[Exchange] {
        &self.registered
    }

    /// Exchanges that could not be registered.
    #[must_use]
    pub fn failures(&self) -> &[RegistrationFailure] {
        &self.failures
    }

    /// Whether every exchange was registered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Error absorbed while tearing down a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TeardownCause {
    /// Broker manager or coordinator teardown failed
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// Driver close failed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A teardown failure for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownError {
    /// The resource being torn down
    pub resource: Resource,
    /// What went wrong
    pub cause: TeardownCause,
}

/// Result of [`Orchestrator::stop`](crate::Orchestrator::stop).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    errors: Vec<TeardownError>,
}

impl ShutdownReport {
    pub(crate) fn record(&mut self, resource: Resource, cause: impl Into<TeardownCause>) {
        self.errors.push(TeardownError {
            resource,
            cause: cause.into(),
        });
    }

    /// Errors absorbed during teardown, in teardown order.
    #[must_use]
    pub fn errors(&self) -> &[TeardownError] {
        &self.errors
    }

    /// Whether every teardown step succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
