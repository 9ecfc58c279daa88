//! In-memory graph driver
//!
//! [`MockGraphDriver`] records every statement run through its sessions and
//! counts session and driver lifecycle calls, so tests can assert that
//! handlers release what they acquire.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a test panic

use convograph_core::graph::{
    GraphDriver, GraphError, GraphSession, QueryResult, SessionConfig, Statement,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A statement as seen by the mock driver.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedStatement {
    /// Database of the session that ran the statement
    pub database: String,
    /// The statement itself
    pub statement: Statement,
}

#[derive(Default)]
struct DriverState {
    closed: AtomicBool,
    close_calls: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    fail_sessions: AtomicBool,
    fail_statements: AtomicBool,
    statements: Mutex<Vec<RecordedStatement>>,
}

/// In-memory [`GraphDriver`] for tests.
///
/// Clones share state, so a test can keep a handle while the orchestrator
/// owns the `Arc<dyn GraphDriver>`.
///
/// # Example
///
/// ```
/// use convograph_core::graph::{GraphDriver, SessionConfig, Statement};
/// use convograph_testing::MockGraphDriver;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let driver = MockGraphDriver::new();
/// let session = driver.session(SessionConfig::default()).await?;
/// session.run(Statement::new("RETURN 1")).await?;
/// session.close().await?;
///
/// assert_eq!(driver.statements().len(), 1);
/// assert_eq!(driver.open_sessions(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockGraphDriver {
    state: Arc<DriverState>,
}

impl MockGraphDriver {
    /// Create a driver that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `session` calls fail with `ConnectionFailed`.
    pub fn fail_sessions(&self, fail: bool) {
        self.state.fail_sessions.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent statements fail with `QueryFailed`.
    pub fn fail_statements(&self, fail: bool) {
        self.state.fail_statements.store(fail, Ordering::SeqCst);
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Number of `close` calls, including repeats.
    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    /// Number of sessions successfully opened.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of sessions closed.
    #[must_use]
    pub fn sessions_closed(&self) -> usize {
        self.state.sessions_closed.load(Ordering::SeqCst)
    }

    /// Sessions opened but not yet closed.
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.sessions_opened().saturating_sub(self.sessions_closed())
    }

    /// Every statement run so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state.statements.lock().unwrap().clone()
    }

    /// Whether two handles share the same underlying driver.
    #[must_use]
    pub fn same_driver(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl GraphDriver for MockGraphDriver {
    fn session(
        &self,
        config: SessionConfig,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GraphSession>, GraphError>> + Send + '_>> {
        Box::pin(async move {
            if self.is_closed() {
                return Err(GraphError::DriverClosed);
            }
            if self.state.fail_sessions.load(Ordering::SeqCst) {
                return Err(GraphError::ConnectionFailed("scripted session failure".to_string()));
            }

            self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MockGraphSession {
                state: Arc::clone(&self.state),
                database: config.database,
                closed: AtomicBool::new(false),
            }) as Box<dyn GraphSession>)
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + '_>> {
        Box::pin(async move {
            self.state.close_calls.fetch_add(1, Ordering::SeqCst);
            self.state.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// Session handed out by [`MockGraphDriver`].
pub struct MockGraphSession {
    state: Arc<DriverState>,
    database: String,
    closed: AtomicBool,
}

impl GraphSession for MockGraphSession {
    fn run(
        &self,
        statement: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, GraphError>> + Send + '_>> {
        Box::pin(async move {
            if self.state.closed.load(Ordering::SeqCst) {
                return Err(GraphError::DriverClosed);
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(GraphError::SessionClosed);
            }
            if self.state.fail_statements.load(Ordering::SeqCst) {
                return Err(GraphError::QueryFailed {
                    code: "Mock.ClientError.Scripted".to_string(),
                    message: "scripted statement failure".to_string(),
                });
            }

            self.state.statements.lock().unwrap().push(RecordedStatement {
                database: self.database.clone(),
                statement,
            });
            Ok(QueryResult::default())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + '_>> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::SeqCst) {
                self.state.sessions_closed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
    }
}
