//! # Convograph Runtime
//!
//! Lifecycle orchestration for the convograph notification fan-out service.
//!
//! This crate owns the logic that decides when each external resource is
//! (re)built, in what order resources are built and torn down, and how the
//! per-exchange handlers are provisioned before consumption begins.
//!
//! ## Core Components
//!
//! - **Orchestrator**: Owns the analytics client, graph driver, broker manager and coordinator
//! - **Notification Coordinator**: Registers one handler per exchange, each with its own session
//! - **Handlers**: Persist notifications into the graph store
//! - **Live Resources**: The production [`ResourceFactory`](convograph_core::ResourceFactory)
//!
//! ## Example
//!
//! ```ignore
//! use convograph_runtime::{LiveResources, Orchestrator, ServerOptions};
//!
//! let mut orchestrator = Orchestrator::new(ServerOptions::from_env()?, LiveResources::default())?;
//! orchestrator.init().await?;
//! let report = orchestrator.start().await?;
//!
//! // ... wait for shutdown ...
//!
//! let shutdown = orchestrator.stop().await;
//! ```

/// Runtime options and graph store credentials
pub mod config;

/// Handler registration against the broker
pub mod coordinator;

/// Error types for orchestrator operations
pub mod error;

/// Per-exchange notification handlers
pub mod handlers;

/// Production resource factory
pub mod live;

/// Prometheus metrics for observability
pub mod metrics;

/// Resource lifecycle state machine
pub mod orchestrator;

/// Registration and shutdown reports
pub mod report;

pub use config::{ConfigError, Credentials, DEFAULT_BIND_PORT, ServerOptions};
pub use coordinator::NotificationCoordinator;
pub use error::{OrchestratorError, Resource};
pub use live::LiveResources;
pub use orchestrator::{LifecycleState, Orchestrator};
pub use report::{
    RegistrationError, RegistrationFailure, RegistrationReport, ShutdownReport, TeardownCause,
    TeardownError,
};
