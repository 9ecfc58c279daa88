//! Analytics API client implementation

use crate::types::{AppCredentials, MessagesEnvelope, TokenRequest, TokenResponse};
use convograph_core::analytics::{
    AnalyticsError, Conversation, ConversationAnalytics, ConversationMessage,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

/// Production API endpoint
pub const DEFAULT_API_URL: &str = "https://api.symbl.ai";

/// Analytics API client
///
/// Construction exchanges the application credentials for an access token,
/// so a client value is always authenticated.
#[derive(Clone)]
pub struct AnalyticsClient {
    client: Client,
    api_url: String,
    access_token: String,
}

impl AnalyticsClient {
    /// Create a client from `SYMBL_APP_ID` / `SYMBL_APP_SECRET`
    ///
    /// `SYMBL_API_URL` overrides the endpoint when set.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::MissingCredential` if either credential is unset
    /// or empty, and the token exchange error otherwise
    pub async fn from_env() -> Result<Self, AnalyticsError> {
        let app_id = non_empty_env("SYMBL_APP_ID")
            .ok_or(AnalyticsError::MissingCredential("SYMBL_APP_ID"))?;
        let app_secret = non_empty_env("SYMBL_APP_SECRET")
            .ok_or(AnalyticsError::MissingCredential("SYMBL_APP_SECRET"))?;
        let api_url = non_empty_env("SYMBL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self::connect(api_url, &AppCredentials::new(app_id, app_secret)).await
    }

    /// Create a client against an explicit endpoint
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, rejected credentials, or parsing failures
    pub async fn connect(
        api_url: impl Into<String>,
        credentials: &AppCredentials,
    ) -> Result<Self, AnalyticsError> {
        let client = Client::new();
        let api_url = api_url.into().trim_end_matches('/').to_string();

        let response = client
            .post(format!("{api_url}/oauth2/token:generate"))
            .json(&TokenRequest::application(credentials))
            .send()
            .await
            .map_err(|e| AnalyticsError::RequestFailed(e.to_string()))?;

        let token: TokenResponse = parse_response(response, None).await?;
        tracing::debug!(
            app_id = %credentials.app_id,
            expires_in = ?token.expires_in,
            "Analytics access token generated"
        );

        Ok(Self {
            client,
            api_url,
            access_token: token.access_token,
        })
    }

    /// Endpoint this client talks to
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, conversation_id: &str) -> Result<T, AnalyticsError> {
        let response = self
            .client
            .get(format!("{}{path}", self.api_url))
            .header("x-api-key", &self.access_token)
            .send()
            .await
            .map_err(|e| AnalyticsError::RequestFailed(e.to_string()))?;

        parse_response(response, Some(conversation_id)).await
    }
}

impl ConversationAnalytics for AnalyticsClient {
    fn conversation<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Conversation, AnalyticsError>> + Send + 'a>> {
        Box::pin(async move {
            self.get(&format!("/v1/conversations/{conversation_id}"), conversation_id)
                .await
        })
    }

    fn messages<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ConversationMessage>, AnalyticsError>> + Send + 'a>> {
        Box::pin(async move {
            let envelope: MessagesEnvelope = self
                .get(&format!("/v1/conversations/{conversation_id}/messages"), conversation_id)
                .await?;
            Ok(envelope.messages)
        })
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    conversation_id: Option<&str>,
) -> Result<T, AnalyticsError> {
    match (response.status(), conversation_id) {
        (StatusCode::OK, _) => response
            .json::<T>()
            .await
            .map_err(|e| AnalyticsError::ResponseParseFailed(e.to_string())),
        (StatusCode::TOO_MANY_REQUESTS, _) => Err(AnalyticsError::RateLimited),
        (StatusCode::UNAUTHORIZED, _) => Err(AnalyticsError::Unauthorized),
        (StatusCode::NOT_FOUND, Some(id)) => Err(AnalyticsError::NotFound(id.to_string())),
        (status, _) => {
            let body = response.text().await.unwrap_or_default();
            Err(AnalyticsError::ApiError {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn authenticated_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token:generate"))
            .and(body_partial_json(json!({ "type": "application", "appId": "app" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "accessToken": "token-1", "expiresIn": 86400 })),
            )
            .mount(&server)
            .await;
        server
    }

    fn credentials() -> AppCredentials {
        AppCredentials::new("app", "shh")
    }

    #[tokio::test]
    async fn test_connect_generates_token() {
        let server = authenticated_server().await;
        let client = AnalyticsClient::connect(format!("{}/", server.uri()), &credentials())
            .await
            .unwrap();

        assert_eq!(client.access_token, "token-1");
        assert_eq!(client.api_url(), server.uri());
    }

    #[tokio::test]
    async fn test_connect_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token:generate"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = AnalyticsClient::connect(server.uri(), &credentials()).await;
        assert!(matches!(result, Err(AnalyticsError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_conversation_fetch() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/conversations/conv-1"))
            .and(header("x-api-key", "token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "conv-1",
                "type": "meeting",
                "name": "Weekly sync",
                "startTime": "2024-05-01T10:00:00Z",
                "members": [{ "name": "Ada", "userId": "ada@example.com" }]
            })))
            .mount(&server)
            .await;

        let client = AnalyticsClient::connect(server.uri(), &credentials()).await.unwrap();
        let conversation = client.conversation("conv-1").await.unwrap();

        assert_eq!(conversation.id, "conv-1");
        assert_eq!(conversation.kind.as_deref(), Some("meeting"));
        assert_eq!(conversation.members.len(), 1);
        assert!(conversation.end_time.is_none());
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_not_found() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/conversations/missing/messages"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = AnalyticsClient::connect(server.uri(), &credentials()).await.unwrap();
        let result = client.messages("missing").await;

        assert_eq!(result, Err(AnalyticsError::NotFound("missing".to_string())));
    }

    #[tokio::test]
    async fn test_messages_unwraps_envelope() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/conversations/conv-1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [
                    { "id": "m1", "text": "Hello", "conversationId": "conv-1" },
                    { "id": "m2", "text": "Hi there", "from": { "name": "Grace" } }
                ]
            })))
            .mount(&server)
            .await;

        let client = AnalyticsClient::connect(server.uri(), &credentials()).await.unwrap();
        let messages = client.messages("conv-1").await.unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].from.as_ref().and_then(|s| s.name.as_deref()), Some("Grace"));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("shh"));
    }
}
