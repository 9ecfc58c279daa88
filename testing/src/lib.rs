//! # Convograph Testing
//!
//! In-memory implementations of the convograph core traits.
//!
//! This crate provides:
//! - [`MockGraphDriver`]: records statements and counts session lifecycles
//! - [`MockBrokerManager`]: subscription map with scripted failures
//! - [`MockAnalyticsClient`]: canned conversation data
//! - [`MockResources`]: a [`ResourceFactory`](convograph_core::ResourceFactory)
//!   that builds the mocks above and remembers them
//!
//! ## Example
//!
//! ```ignore
//! use convograph_runtime::{Orchestrator, ServerOptions};
//! use convograph_testing::MockResources;
//!
//! #[tokio::test]
//! async fn test_start_registers_everything() {
//!     let resources = MockResources::new();
//!     let mut orchestrator = Orchestrator::new(test_options(), resources.clone());
//!
//!     orchestrator.init().await.unwrap();
//!     let report = orchestrator.start().await.unwrap();
//!
//!     assert!(report.is_complete());
//!     assert_eq!(resources.latest_broker().unwrap().subscription_names().len(), 6);
//! }
//! ```

pub mod analytics_mocks;
pub mod broker_mocks;
pub mod graph_mocks;
pub mod resource_mocks;

pub use analytics_mocks::MockAnalyticsClient;
pub use broker_mocks::MockBrokerManager;
pub use graph_mocks::{MockGraphDriver, MockGraphSession, RecordedStatement};
pub use resource_mocks::{MockResources, ResourceKind};

/// Route `tracing` output through the test harness.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
