//! Graph database abstraction for persisting conversation intelligence.
//!
//! This module defines the driver/session split used by the rest of the
//! workspace. A [`GraphDriver`] owns a connection pool and hands out
//! [`GraphSession`]s; each session executes Cypher [`Statement`]s in its own
//! transaction scope.
//!
//! # Implementations
//!
//! - `Neo4jDriver` (in `convograph-neo4j`): Production implementation over the Neo4j HTTP API
//! - `MockGraphDriver` (in `convograph-testing`): In-memory driver that records statements
//!
//! # Example
//!
//! ```no_run
//! use convograph_core::graph::{GraphDriver, GraphError, SessionConfig, Statement};
//!
//! async fn example(driver: &dyn GraphDriver) -> Result<(), GraphError> {
//!     let session = driver.session(SessionConfig::default()).await?;
//!
//!     let statement = Statement::new("MERGE (c:Conversation {conversationId: $id})")
//!         .param("id", "conv-123");
//!     session.run(statement).await?;
//!
//!     session.close().await
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Database used when a session does not name one explicitly.
pub const DEFAULT_DATABASE: &str = "neo4j";

/// Errors that can occur during graph database operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The connection string could not be parsed or uses an unsupported scheme.
    #[error("Invalid connection string '{uri}': {reason}")]
    InvalidUri {
        /// The rejected connection string
        uri: String,
        /// Why it was rejected
        reason: String,
    },

    /// The server rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Transport-level failure talking to the server.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The server reported an error for a statement.
    #[error("Query failed [{code}]: {message}")]
    QueryFailed {
        /// Server status code (e.g. `Neo.ClientError.Statement.SyntaxError`)
        code: String,
        /// Server error message
        message: String,
    },

    /// The driver has been closed; no new sessions can be opened.
    #[error("Driver is closed")]
    DriverClosed,

    /// The session has been closed; no further statements can run.
    #[error("Session is closed")]
    SessionClosed,

    /// Generic error for other failures
    #[error("Graph error: {0}")]
    Other(String),
}

/// Username/password pair for basic authentication.
///
/// The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    /// Create a new credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Per-session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Database the session runs against
    pub database: String,
}

impl SessionConfig {
    /// Session bound to the named database.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

/// A parameterized Cypher statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Cypher text
    #[serde(rename = "statement")]
    pub text: String,
    /// Named parameters referenced as `$name` in the text
    pub parameters: Map<String, Value>,
}

impl Statement {
    /// Create a statement without parameters.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Map::new(),
        }
    }

    /// Add a named parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Rows returned by a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, in return order
    pub columns: Vec<String>,
    /// One entry per row, values aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Number of rows returned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A unit of work against the graph store.
///
/// Sessions are cheap to hold but are not shared: every message handler owns
/// its own session so that categories never share a transaction scope.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so handlers can hold a `Box<dyn GraphSession>`.
pub trait GraphSession: Send + Sync {
    /// Execute a single statement in an auto-committed transaction.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` / `DriverClosed`: the session or its driver was closed
    /// - `QueryFailed`: the server rejected the statement
    /// - `ConnectionFailed` / `Unauthorized`: transport or auth failure
    fn run(
        &self,
        statement: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, GraphError>> + Send + '_>>;

    /// Release the session. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the backend fails to release server-side state.
    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + '_>>;
}

/// Connection-pool owner for the graph store.
///
/// A driver is safe for concurrent use: several sessions may be provisioned
/// from it at the same time.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn GraphDriver>`).
pub trait GraphDriver: Send + Sync {
    /// Provision a new session.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DriverClosed`] after [`close`](Self::close), or a
    /// backend error if the session cannot be established.
    fn session(
        &self,
        config: SessionConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GraphSession>, GraphError>> + Send + '_>>;

    /// Close the driver and every connection it pooled.
    ///
    /// Sessions provisioned earlier fail with [`GraphError::DriverClosed`]
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the backend fails to shut down cleanly.
    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_debug_redacts_password() {
        let auth = BasicAuth::new("neo4j", "secret");
        let debug = format!("{auth:?}");
        assert!(debug.contains("neo4j"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn statement_serializes_in_transactional_shape() {
        let statement = Statement::new("RETURN $x").param("x", 1);
        let json = serde_json::to_value(&statement).unwrap_or_default();
        assert_eq!(json["statement"], "RETURN $x");
        assert_eq!(json["parameters"]["x"], 1);
    }

    #[test]
    fn default_session_targets_default_database() {
        assert_eq!(SessionConfig::default().database, DEFAULT_DATABASE);
    }
}
