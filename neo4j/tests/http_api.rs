//! HTTP API tests for the Neo4j driver against a mock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use convograph_core::graph::{BasicAuth, GraphDriver, GraphError, SessionConfig, Statement};
use convograph_neo4j::Neo4jDriver;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("neo4j:secret")
const AUTH_HEADER: &str = "Basic bmVvNGo6c2VjcmV0";

fn driver_for(server: &MockServer) -> Neo4jDriver {
    Neo4jDriver::new(&server.uri(), BasicAuth::new("neo4j", "secret")).unwrap()
}

#[tokio::test]
async fn run_posts_statement_to_commit_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/db/neo4j/tx/commit"))
        .and(header("authorization", AUTH_HEADER))
        .and(body_partial_json(json!({
            "statements": [{
                "statement": "MERGE (c:Conversation {conversationId: $conversation_id}) RETURN c.conversationId",
                "parameters": { "conversation_id": "conv-1" }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "columns": ["c.conversationId"], "data": [{ "row": ["conv-1"] }] }],
            "errors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let session = driver.session(SessionConfig::default()).await.unwrap();
    let result = session
        .run(
            Statement::new(
                "MERGE (c:Conversation {conversationId: $conversation_id}) RETURN c.conversationId",
            )
            .param("conversation_id", "conv-1"),
        )
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.rows[0][0], json!("conv-1"));
}

#[tokio::test]
async fn session_targets_configured_database() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/db/analytics/tx/commit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [], "errors": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let session = driver.session(SessionConfig::new("analytics")).await.unwrap();
    let result = session.run(Statement::new("RETURN 1")).await.unwrap();

    assert!(result.is_empty());
}

#[tokio::test]
async fn statement_errors_surface_as_query_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/db/neo4j/tx/commit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [],
            "errors": [{
                "code": "Neo.ClientError.Statement.SyntaxError",
                "message": "Invalid input 'MERG'"
            }]
        })))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let session = driver.session(SessionConfig::default()).await.unwrap();
    let err = session.run(Statement::new("MERG (n)")).await.unwrap_err();

    assert!(matches!(err, GraphError::QueryFailed { code, .. } if code.ends_with("SyntaxError")));
}

#[tokio::test]
async fn rejected_credentials_are_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/db/neo4j/tx/commit"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let session = driver.session(SessionConfig::default()).await.unwrap();
    let err = session.run(Statement::new("RETURN 1")).await.unwrap_err();

    assert!(matches!(err, GraphError::Unauthorized(_)));
}

#[tokio::test]
async fn verify_connectivity_checks_discovery_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("authorization", AUTH_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "neo4j_version": "5.20.0" })))
        .expect(1)
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    driver.verify_connectivity().await.unwrap();
}

#[tokio::test]
async fn closed_session_and_driver_refuse_statements() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [], "errors": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let driver = driver_for(&server);
    let first = driver.session(SessionConfig::default()).await.unwrap();
    let second = driver.session(SessionConfig::default()).await.unwrap();

    first.close().await.unwrap();
    first.close().await.unwrap();
    assert_eq!(
        first.run(Statement::new("RETURN 1")).await.unwrap_err(),
        GraphError::SessionClosed
    );

    driver.close().await.unwrap();
    assert_eq!(
        second.run(Statement::new("RETURN 1")).await.unwrap_err(),
        GraphError::DriverClosed
    );
}
