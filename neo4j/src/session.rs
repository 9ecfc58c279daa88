//! Sessions over the transactional HTTP endpoint.

use crate::DriverShared;
use convograph_core::graph::{GraphError, GraphSession, QueryResult, Statement};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A session bound to one database.
///
/// Each [`run`](GraphSession::run) call is an auto-committed transaction.
pub struct Neo4jSession {
    shared: Arc<DriverShared>,
    commit_url: Url,
    database: String,
    closed: AtomicBool,
}

impl Neo4jSession {
    pub(crate) fn open(shared: Arc<DriverShared>, database: &str) -> Result<Self, GraphError> {
        if database.is_empty() {
            return Err(GraphError::Other("database name must not be empty".to_string()));
        }

        let commit_url = shared
            .base_url
            .join(&format!("db/{database}/tx/commit"))
            .map_err(|e| GraphError::Other(format!("Invalid database name '{database}': {e}")))?;

        Ok(Self {
            shared,
            commit_url,
            database: database.to_string(),
            closed: AtomicBool::new(false),
        })
    }

    /// Database this session runs against.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    fn ensure_open(&self) -> Result<(), GraphError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(GraphError::DriverClosed);
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(GraphError::SessionClosed);
        }
        Ok(())
    }

    async fn execute(&self, statement: Statement) -> Result<QueryResult, GraphError> {
        self.ensure_open()?;

        let body = CommitRequest {
            statements: [&statement],
        };

        let response = self
            .shared
            .client
            .post(self.commit_url.clone())
            .basic_auth(self.shared.auth.username(), Some(self.shared.auth.password()))
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GraphError::Unauthorized(format!(
                "server rejected user '{}'",
                self.shared.auth.username()
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GraphError::ConnectionFailed(format!(
                "unexpected status {status}: {message}"
            )));
        }

        let payload: CommitResponse = response
            .json()
            .await
            .map_err(|e| GraphError::Other(format!("Failed to parse response: {e}")))?;

        payload.into_result()
    }
}

impl GraphSession for Neo4jSession {
    fn run(
        &self,
        statement: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<QueryResult, GraphError>> + Send + '_>> {
        Box::pin(async move {
            let result = self.execute(statement).await;
            if let Err(e) = &result {
                tracing::debug!(database = %self.database, error = %e, "Statement failed");
            }
            result
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), GraphError>> + Send + '_>> {
        Box::pin(async move {
            if !self.closed.swap(true, Ordering::AcqRel) {
                tracing::debug!(database = %self.database, "Closed graph session");
            }
            Ok(())
        })
    }
}

#[derive(Serialize)]
struct CommitRequest<'a> {
    statements: [&'a Statement; 1],
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: String,
    message: String,
}

impl CommitResponse {
    fn into_result(self) -> Result<QueryResult, GraphError> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(GraphError::QueryFailed {
                code: error.code,
                message: error.message,
            });
        }

        Ok(self
            .results
            .into_iter()
            .next()
            .map(|result| QueryResult {
                columns: result.columns,
                rows: result.data.into_iter().map(|data| data.row).collect(),
            })
            .unwrap_or_default())
    }
}
