//! Conversation analytics client abstraction.
//!
//! The analytics service is the upstream source of conversation data. The
//! orchestrator keeps one client alive for the lifetime of the process and
//! replaces it wholesale when it is rebuilt; the client holds no connection
//! state that would need tearing down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur when talking to the analytics service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// A required credential is not set
    #[error("Missing {0} environment variable")]
    MissingCredential(&'static str),

    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - invalid application credentials or expired token
    #[error("Unauthorized - invalid credentials")]
    Unauthorized,

    /// Requested conversation does not exist
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
}

/// Participant in a conversation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    /// Speaker identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Email or external user identifier
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Conversation metadata.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Conversation identifier
    pub id: String,
    /// Conversation type (e.g. `meeting`)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,
    /// Start timestamp
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Participants
    #[serde(default)]
    pub members: Vec<Speaker>,
}

/// A single transcribed message in a conversation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    /// Message identifier
    pub id: String,
    /// Transcribed text
    pub text: String,
    /// Who said it
    #[serde(default)]
    pub from: Option<Speaker>,
    /// Start timestamp
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Owning conversation
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Read access to conversation data.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// to enable trait object usage (`Arc<dyn ConversationAnalytics>`).
pub trait ConversationAnalytics: Send + Sync {
    /// Fetch conversation metadata.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::NotFound`] for unknown ids and transport or
    /// API errors otherwise.
    fn conversation<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Conversation, AnalyticsError>> + Send + 'a>>;

    /// Fetch the transcribed messages of a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::NotFound`] for unknown ids and transport or
    /// API errors otherwise.
    fn messages<'a>(
        &'a self,
        conversation_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ConversationMessage>, AnalyticsError>> + Send + 'a>>;
}
