//! Wire types for the analytics REST API

use convograph_core::analytics::ConversationMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Application credentials exchanged for an access token
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredentials {
    /// Application identifier
    pub app_id: String,
    /// Application secret
    pub app_secret: String,
}

impl AppCredentials {
    /// Create a credential pair
    #[must_use]
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }
}

impl fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Body of the token generation request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

impl<'a> TokenRequest<'a> {
    pub(crate) fn application(credentials: &'a AppCredentials) -> Self {
        Self {
            kind: "application",
            app_id: credentials.app_id.as_str(),
            app_secret: credentials.app_secret.as_str(),
        }
    }
}

/// Token generation response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Envelope of the conversation messages endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct MessagesEnvelope {
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
}
