//! Lifecycle counters and their Prometheus endpoint.
//!
//! Counters emitted across the workspace:
//! - `coordinator.registration` by exchange and outcome
//! - `orchestrator.rebuild` by resource and outcome
//! - `orchestrator.teardown.failed` by resource
//! - `broker.messages` by exchange and outcome
//!
//! ```rust,no_run
//! use convograph_runtime::metrics::{MetricsServer, seed_counters};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9000".parse()?);
//! server.start()?;
//! seed_counters();
//! # Ok(())
//! # }
//! ```

use crate::error::Resource;
use convograph_core::exchange::Exchange;
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

pub use metrics::counter;

/// Exporter setup failures.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The listener or recorder could not be configured
    #[error("Prometheus exporter setup failed: {0}")]
    Build(String),
    /// The global recorder slot is held by an incompatible recorder
    #[error("Prometheus recorder rejected: {0}")]
    Install(String),
}

/// Serves the lifecycle counters on `/metrics` at the bind port.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Listener on `addr`; nothing is bound until [`start`](Self::start).
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and spawn the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime. When another recorder is
    /// already installed the existing one is kept and `render` returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Build`] when the listener cannot be set up.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                register_metrics();
                tokio::spawn(async move {
                    if exporter.await.is_err() {
                        tracing::error!("Metrics exporter stopped");
                    }
                });
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Serving lifecycle counters on /metrics");
                Ok(())
            },
            Err(e) => {
                let reason = e.to_string();
                if reason.contains("already") {
                    tracing::warn!("Global recorder already set, keeping it");
                    Ok(())
                } else {
                    Err(MetricsError::Install(reason))
                }
            },
        }
    }

    /// Handle of the installed recorder, if this server installed it.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Current counters in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Describe the counters convograph emits.
fn register_metrics() {
    describe_counter!(
        "coordinator.registration",
        "Handler registration attempts by exchange and outcome"
    );
    describe_counter!(
        "orchestrator.rebuild",
        "Resource construction attempts by resource and outcome"
    );
    describe_counter!(
        "orchestrator.teardown.failed",
        "Teardown failures absorbed during rebuild or stop"
    );
    describe_counter!(
        "broker.messages",
        "Deliveries handled or rejected by exchange"
    );
}

/// Pre-register zeroed counters so dashboards see every series from startup.
pub fn seed_counters() {
    for exchange in Exchange::ALL {
        counter!("coordinator.registration", "exchange" => exchange.name(), "outcome" => "registered")
            .absolute(0);
    }
    for resource in [Resource::AnalyticsClient, Resource::Database, Resource::MessageBus] {
        counter!("orchestrator.rebuild", "resource" => resource.name(), "outcome" => "failed")
            .absolute(0);
    }
}
