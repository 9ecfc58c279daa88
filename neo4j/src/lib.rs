//! Neo4j graph driver for convograph.
//!
//! This crate implements the [`GraphDriver`] and [`GraphSession`] traits from
//! `convograph-core` on top of the Neo4j HTTP transactional API, using
//! reqwest with basic authentication.
//!
//! # Sessions
//!
//! Every session runs its statements through the auto-commit endpoint
//! (`/db/{database}/tx/commit`), so a session carries no server-side state.
//! Sessions share the driver's HTTP connection pool; closing the driver
//! invalidates every session provisioned from it.
//!
//! # Example
//!
//! ```no_run
//! use convograph_core::graph::{BasicAuth, GraphDriver, SessionConfig, Statement};
//! use convograph_neo4j::Neo4jDriver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = Neo4jDriver::new("bolt://localhost:7687", BasicAuth::new("neo4j", "secret"))?;
//!
//! let session = driver.session(SessionConfig::default()).await?;
//! let result = session.run(Statement::new("MATCH (c:Conversation) RETURN count(c)")).await?;
//! println!("rows: {}", result.len());
//!
//! driver.close().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod endpoint;
mod session;

pub use session::Neo4jSession;

use convograph_core::graph::{BasicAuth, GraphDriver, GraphError, GraphSession, SessionConfig};
use reqwest::{Client, StatusCode, Url};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// State shared between a driver and its sessions.
pub(crate) struct DriverShared {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) auth: BasicAuth,
    pub(crate) closed: AtomicBool,
}

/// Neo4j driver over the HTTP transactional API.
///
/// Construction validates the connection string and prepares the HTTP client;
/// it does not contact the server. Use
/// [`verify_connectivity`](Self::verify_connectivity) to check reachability
/// and credentials up front.
pub struct Neo4jDriver {
    shared: Arc<DriverShared>,
}

impl Neo4jDriver {
    /// Create a driver with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUri`] for malformed or unsupported connection
    /// strings.
    pub fn new(uri: &str, auth: BasicAuth) -> Result<Self, GraphError> {
        Self::builder().uri(uri).auth(auth).build()
    }

    /// Create a new builder for configuring the driver.
    #[must_use]
    pub fn builder() -> Neo4jDriverBuilder {
        Neo4jDriverBuilder::default()
    }

    /// Base URL of the HTTP API this driver talks to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.shared.base_url
    }

    /// Whether [`close`](GraphDriver::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Check that the server is reachable and accepts the credentials.
    ///
    /// # Errors
    ///
    /// - `DriverClosed` after the driver was closed
    /// - `Unauthorized` if the credentials are rejected
    /// - `ConnectionFailed` for transport failures or unexpected statuses
    pub async fn verify_connectivity(&self) -> Result<(), GraphError> {
        if self.is_closed() {
            return Err(GraphError::DriverClosed);
        }

        let response = self
            .shared
            .client
            .get(self.shared.base_url.clone())
            .basic_auth(self.shared.auth.username(), Some(self.shared.auth.password()))
            .send()
            .await
            .map_err(|e| GraphError::ConnectionFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GraphError::Unauthorized(
                format!("server rejected user '{}'", self.shared.auth.username()),
            )),
            status => Err(GraphError::ConnectionFailed(format!(
                "unexpected status {status} from {}",
                self.shared.base_url
            ))),
        }
    }
}

impl GraphDriver for Neo4jDriver {
    fn session(
        &self,
        config: SessionConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GraphSession>, GraphError>> + Send + '_>> {
        Box::pin(async move {
            if self.is_closed() {
                return Err(GraphError::DriverClosed);
            }

            let session = Neo4jSession::open(Arc::clone(&self.shared), &config.database)?;
            tracing::debug!(database = %config.database, "Opened graph session");
            Ok(Box::new(session) as Box<dyn GraphSession>)
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + '_>> {
        Box::pin(async move {
            if !self.shared.closed.swap(true, Ordering::AcqRel) {
                tracing::debug!(url = %self.shared.base_url, "Closed graph driver");
            }
            Ok(())
        })
    }
}

/// Builder for configuring a [`Neo4jDriver`].
#[derive(Default)]
pub struct Neo4jDriverBuilder {
    uri: Option<String>,
    auth: Option<BasicAuth>,
    timeout: Option<Duration>,
}

impl Neo4jDriverBuilder {
    /// Set the connection string (`bolt://`, `neo4j://`, `http://`, ...).
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the basic authentication credentials.
    #[must_use]
    pub fn auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the per-request timeout.
    ///
    /// Default: 30 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the [`Neo4jDriver`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidUri`] if the URI is missing or invalid, and
    /// [`GraphError::Other`] if credentials are missing or the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<Neo4jDriver, GraphError> {
        let uri = self.uri.ok_or_else(|| GraphError::InvalidUri {
            uri: String::new(),
            reason: "connection string not set".to_string(),
        })?;
        let auth = self
            .auth
            .ok_or_else(|| GraphError::Other("credentials not set".to_string()))?;
        let base_url = endpoint::resolve(&uri)?;

        let client = Client::builder()
            .timeout(self.timeout.unwrap_or_else(|| Duration::from_secs(30)))
            .build()
            .map_err(|e| GraphError::Other(format!("Failed to create HTTP client: {e}")))?;

        tracing::debug!(uri = %uri, url = %base_url, user = %auth.username(), "Created graph driver");

        Ok(Neo4jDriver {
            shared: Arc::new(DriverShared {
                client,
                base_url,
                auth,
                closed: AtomicBool::new(false),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_builder_requires_uri() {
        let result = Neo4jDriver::builder()
            .auth(BasicAuth::new("neo4j", "secret"))
            .build();
        assert!(matches!(result, Err(GraphError::InvalidUri { .. })));
    }

    #[test]
    fn test_builder_requires_auth() {
        let result = Neo4jDriver::builder().uri("bolt://db:7687").build();
        assert!(matches!(result, Err(GraphError::Other(_))));
    }

    #[test]
    fn test_new_resolves_http_endpoint() {
        let driver = Neo4jDriver::new("bolt://db:7687", BasicAuth::new("neo4j", "secret")).unwrap();
        assert_eq!(driver.base_url().as_str(), "http://db:7474/");
        assert!(!driver.is_closed());
    }

    #[tokio::test]
    async fn test_closed_driver_refuses_sessions() {
        let driver = Neo4jDriver::new("http://localhost:7474", BasicAuth::new("neo4j", "secret")).unwrap();
        driver.close().await.unwrap();
        driver.close().await.unwrap();

        assert!(driver.is_closed());
        assert!(matches!(
            driver.session(SessionConfig::default()).await,
            Err(GraphError::DriverClosed)
        ));
    }
}
