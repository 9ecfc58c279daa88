//! Resource lifecycle orchestration.
//!
//! The [`Orchestrator`] exclusively owns the three long-lived resources
//! (analytics client, graph driver, broker manager) and the notification
//! coordinator built on top of them.
//!
//! # Lifecycle
//!
//! ```text
//!                  init                 start
//! Uninitialized ─────────► Ready ─────────────► Running
//!       ▲    \                                     │
//!       │     └─► Partial (failed init/rebuild)    │
//!       │                                          │
//!       └──────────────────── stop ◄───────────────┘
//! ```
//!
//! # Ordering
//!
//! - `init` builds analytics client, driver, broker manager, in that order,
//!   and stops at the first failure
//! - every rebuild tears down the previous resource before building the next
//! - the coordinator is torn down before the driver or broker manager it is
//!   bound to is replaced, so a held coordinator always runs on live handles
//! - `stop` tears down coordinator, broker manager, driver, in that order,
//!   attempting every step

use crate::config::{ConfigError, Credentials, ServerOptions};
use crate::coordinator::NotificationCoordinator;
use crate::error::{OrchestratorError, Resource};
use crate::report::{RegistrationReport, ShutdownReport};
use convograph_core::analytics::ConversationAnalytics;
use convograph_core::broker::BrokerManager;
use convograph_core::graph::GraphDriver;
use convograph_core::resources::ResourceFactory;
use std::sync::Arc;

/// Derived lifecycle state of an [`Orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No resources held
    Uninitialized,
    /// Some but not all resources held, no coordinator
    Partial,
    /// All three resources held, no coordinator
    Ready,
    /// A coordinator is registered and consuming
    Running,
}

/// Resource handles owned by the orchestrator.
///
/// Each handle is either absent or live; a handle is never kept after its
/// resource was torn down.
#[derive(Default)]
struct ResourceHandles {
    analytics: Option<Arc<dyn ConversationAnalytics>>,
    driver: Option<Arc<dyn GraphDriver>>,
    broker: Option<Arc<dyn BrokerManager>>,
    coordinator: Option<NotificationCoordinator>,
}

impl ResourceHandles {
    fn state(&self) -> LifecycleState {
        if self.coordinator.is_some() {
            return LifecycleState::Running;
        }
        let held = [
            self.analytics.is_some(),
            self.driver.is_some(),
            self.broker.is_some(),
        ]
        .into_iter()
        .filter(|held| *held)
        .count();

        match held {
            0 => LifecycleState::Uninitialized,
            3 => LifecycleState::Ready,
            _ => LifecycleState::Partial,
        }
    }
}

/// Lifecycle owner for the notification fan-out service.
///
/// # Example
///
/// ```no_run
/// use convograph_runtime::{LiveResources, Orchestrator, ServerOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = ServerOptions::from_env()?;
/// let mut orchestrator = Orchestrator::new(options, LiveResources::default())?;
///
/// orchestrator.init().await?;
/// let report = orchestrator.start().await?;
/// println!("registered {} exchanges", report.registered().len());
///
/// let shutdown = orchestrator.stop().await;
/// assert!(shutdown.is_clean());
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator<F> {
    options: ServerOptions,
    credentials: Credentials,
    factory: F,
    handles: ResourceHandles,
}

impl<F: ResourceFactory> Orchestrator<F> {
    /// Create an orchestrator with credentials read from the environment.
    ///
    /// A zero bind port is replaced with the default. No resource is built.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if `NEO4J_CONNECTION`,
    /// `NEO4J_USERNAME` or `NEO4J_PASSWORD` is missing or empty.
    pub fn new(options: ServerOptions, factory: F) -> Result<Self, ConfigError> {
        let credentials = Credentials::from_env()?;
        Ok(Self::with_credentials(options, credentials, factory))
    }

    /// Create an orchestrator with explicit credentials.
    #[must_use]
    pub fn with_credentials(options: ServerOptions, credentials: Credentials, factory: F) -> Self {
        let options = options.with_defaults();
        tracing::debug!(
            bind_port = options.bind_port,
            graph = %credentials.connection(),
            "Orchestrator created"
        );
        Self {
            options,
            credentials,
            factory,
            handles: ResourceHandles::default(),
        }
    }

    /// Effective runtime options.
    #[must_use]
    pub const fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.handles.state()
    }

    /// The live analytics client, if any.
    #[must_use]
    pub fn analytics_client(&self) -> Option<Arc<dyn ConversationAnalytics>> {
        self.handles.analytics.clone()
    }

    /// Whether a graph driver is held.
    #[must_use]
    pub const fn has_database(&self) -> bool {
        self.handles.driver.is_some()
    }

    /// Whether a broker manager is held.
    #[must_use]
    pub const fn has_message_bus(&self) -> bool {
        self.handles.broker.is_some()
    }

    /// Build every resource: analytics client, driver, broker manager.
    ///
    /// # Errors
    ///
    /// Returns the first construction failure unchanged; later resources are
    /// not attempted.
    #[tracing::instrument(skip(self), name = "orchestrator_init")]
    pub async fn init(&mut self) -> Result<(), OrchestratorError> {
        self.rebuild_analytics_client().await?;
        self.rebuild_database().await?;
        self.rebuild_message_bus().await?;
        tracing::info!("Orchestrator initialized");
        Ok(())
    }

    /// Register the notification handlers and begin consumption.
    ///
    /// Missing resources are rebuilt first (driver, analytics client, broker
    /// manager). A coordinator left by an earlier `start` is torn down before
    /// its replacement registers.
    ///
    /// # Errors
    ///
    /// Returns the first rebuild failure, or the broker's error if
    /// consumption cannot begin. Resources rebuilt before the failure are
    /// kept.
    ///
    /// When consumption cannot begin the new coordinator is still held, so
    /// the state reads [`LifecycleState::Running`] and a later `start` or
    /// `stop` deletes the subscriptions it registered.
    #[tracing::instrument(skip(self), name = "orchestrator_start")]
    pub async fn start(&mut self) -> Result<RegistrationReport, OrchestratorError> {
        let driver = match self.handles.driver.clone() {
            Some(driver) => driver,
            None => self.build_driver().await?,
        };
        if self.handles.analytics.is_none() {
            self.rebuild_analytics_client().await?;
        }
        let broker = match self.handles.broker.clone() {
            Some(broker) => broker,
            None => self.build_broker().await?,
        };

        self.retire_coordinator().await;

        let coordinator = NotificationCoordinator::new(driver, broker);
        let report = coordinator.init().await;
        let started = coordinator.start().await;
        self.handles.coordinator = Some(coordinator);
        started.map_err(OrchestratorError::Coordinator)?;

        tracing::info!(
            registered = report.registered().len(),
            failed = report.failures().len(),
            "Orchestrator started"
        );
        Ok(report)
    }

    /// Replace the analytics client.
    ///
    /// # Errors
    ///
    /// Returns the client's construction error; the previous client is
    /// dropped either way.
    pub async fn rebuild_analytics_client(&mut self) -> Result<(), OrchestratorError> {
        self.handles.analytics = None;
        let client = self
            .factory
            .analytics_client()
            .await
            .map_err(OrchestratorError::AnalyticsClient);
        self.handles.analytics = Some(record_rebuild(Resource::AnalyticsClient, client)?);
        Ok(())
    }

    /// Close the current driver, if any, and build a new one.
    ///
    /// A running coordinator is torn down first; call `start` again to
    /// register handlers against the new driver.
    ///
    /// # Errors
    ///
    /// Returns the driver's construction error; the handle is left absent.
    pub async fn rebuild_database(&mut self) -> Result<(), OrchestratorError> {
        self.build_driver().await.map(drop)
    }

    /// Tear down the current broker manager, if any, and build a new one.
    ///
    /// A running coordinator is torn down first. Teardown errors of the
    /// coordinator and of the previous manager are logged, not returned.
    ///
    /// # Errors
    ///
    /// Returns the manager's construction error; the handle is left absent.
    pub async fn rebuild_message_bus(&mut self) -> Result<(), OrchestratorError> {
        self.build_broker().await.map(drop)
    }

    async fn build_driver(&mut self) -> Result<Arc<dyn GraphDriver>, OrchestratorError> {
        self.retire_coordinator().await;
        let previous = self.handles.driver.take();
        let driver = replace_driver(&self.factory, &self.credentials, previous).await;
        let driver = record_rebuild(Resource::Database, driver)?;
        self.handles.driver = Some(Arc::clone(&driver));
        Ok(driver)
    }

    async fn build_broker(&mut self) -> Result<Arc<dyn BrokerManager>, OrchestratorError> {
        self.retire_coordinator().await;
        let previous = self.handles.broker.take();
        let broker = replace_broker(&self.factory, &self.options.broker_uri, previous).await;
        let broker = record_rebuild(Resource::MessageBus, broker)?;
        self.handles.broker = Some(Arc::clone(&broker));
        Ok(broker)
    }

    /// Delete the held coordinator's subscriptions, absorbing failures.
    async fn retire_coordinator(&mut self) {
        if let Some(previous) = self.handles.coordinator.take() {
            if let Err(e) = previous.teardown().await {
                tracing::warn!(error = %e, "Previous coordinator teardown failed");
                metrics::counter!("orchestrator.teardown.failed", "resource" => Resource::Coordinator.name())
                    .increment(1);
            }
        }
    }

    /// Tear down coordinator, broker manager and driver, and drop the
    /// analytics client.
    ///
    /// Every step is attempted. Calling `stop` again is harmless.
    #[tracing::instrument(skip(self), name = "orchestrator_stop")]
    pub async fn stop(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        if let Some(coordinator) = self.handles.coordinator.take() {
            if let Err(e) = coordinator.teardown().await {
                absorb(&mut report, Resource::Coordinator, e);
            }
        }
        if let Some(broker) = self.handles.broker.take() {
            if let Err(e) = broker.teardown().await {
                absorb(&mut report, Resource::MessageBus, e);
            }
        }
        if let Some(driver) = self.handles.driver.take() {
            if let Err(e) = driver.close().await {
                absorb(&mut report, Resource::Database, e);
            }
        }
        self.handles.analytics = None;

        tracing::info!(errors = report.errors().len(), "Orchestrator stopped");
        report
    }
}

async fn replace_driver<F: ResourceFactory>(
    factory: &F,
    credentials: &Credentials,
    previous: Option<Arc<dyn GraphDriver>>,
) -> Result<Arc<dyn GraphDriver>, OrchestratorError> {
    if let Some(previous) = previous {
        if let Err(e) = previous.close().await {
            tracing::warn!(error = %e, "Failed to close previous graph driver");
            metrics::counter!("orchestrator.teardown.failed", "resource" => Resource::Database.name())
                .increment(1);
        }
    }

    factory
        .graph_driver(credentials.connection(), credentials.basic_auth())
        .await
        .map_err(OrchestratorError::Database)
}

async fn replace_broker<F: ResourceFactory>(
    factory: &F,
    broker_uri: &str,
    previous: Option<Arc<dyn BrokerManager>>,
) -> Result<Arc<dyn BrokerManager>, OrchestratorError> {
    if let Some(previous) = previous {
        if let Err(e) = previous.teardown().await {
            tracing::warn!(error = %e, "Failed to tear down previous broker manager");
            metrics::counter!("orchestrator.teardown.failed", "resource" => Resource::MessageBus.name())
                .increment(1);
        }
    }

    factory
        .broker_manager(broker_uri)
        .await
        .map_err(OrchestratorError::MessageBus)
}

fn record_rebuild<T>(
    resource: Resource,
    result: Result<T, OrchestratorError>,
) -> Result<T, OrchestratorError> {
    match &result {
        Ok(_) => {
            metrics::counter!("orchestrator.rebuild", "resource" => resource.name(), "outcome" => "ok")
                .increment(1);
            tracing::info!(resource = %resource, "Resource built");
        },
        Err(e) => {
            metrics::counter!("orchestrator.rebuild", "resource" => resource.name(), "outcome" => "failed")
                .increment(1);
            tracing::error!(resource = %resource, error = %e, "Resource construction failed");
        },
    }
    result
}

fn absorb(
    report: &mut ShutdownReport,
    resource: Resource,
    cause: impl Into<crate::report::TeardownCause> + std::fmt::Display,
) {
    tracing::warn!(resource = %resource, error = %cause, "Teardown failed");
    metrics::counter!("orchestrator.teardown.failed", "resource" => resource.name()).increment(1);
    report.record(resource, cause);
}
