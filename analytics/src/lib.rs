//! # Conversation Analytics Client
//!
//! REST client for the conversation analytics service that produces the
//! notifications convograph persists. Implements
//! [`ConversationAnalytics`](convograph_core::analytics::ConversationAnalytics).
//!
//! ## Example
//!
//! ```no_run
//! use convograph_analytics::AnalyticsClient;
//! use convograph_core::analytics::ConversationAnalytics;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Authenticate with SYMBL_APP_ID / SYMBL_APP_SECRET
//!     let client = AnalyticsClient::from_env().await?;
//!
//!     let conversation = client.conversation("conv-123").await?;
//!     println!("Conversation: {:?}", conversation.name);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod types;

// Re-export main types for convenience
pub use client::{AnalyticsClient, DEFAULT_API_URL};
pub use types::AppCredentials;
