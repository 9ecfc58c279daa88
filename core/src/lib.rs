//! # Convograph Core
//!
//! Core traits and types for the convograph notification fan-out service.
//!
//! Convograph consumes conversation-intelligence notifications from a message
//! broker and persists them into a graph store. This crate defines the seams
//! between the lifecycle logic in `convograph-runtime` and the external
//! systems it drives:
//!
//! - [`graph`]: driver and session traits for the graph store
//! - [`broker`]: subscription management and the message handler contract
//! - [`analytics`]: read access to the conversation analytics service
//! - [`exchange`]: the closed set of notification exchanges
//! - [`resources`]: the factory the orchestrator builds resources through
//!
//! ## Architecture
//!
//! ```text
//!          ┌──────────────┐
//!          │ Orchestrator │── ResourceFactory ──► driver / broker / client
//!          └──────┬───────┘
//!                 │ start
//!                 ▼
//!      ┌─────────────────────┐
//!      │ NotificationCoord.  │── one session per Exchange
//!      └──────────┬──────────┘
//!                 │ create_subscription
//!                 ▼
//!          ┌──────────────┐      messages      ┌────────────────┐
//!          │ BrokerManager│ ─────────────────► │ MessageHandler │──► graph
//!          └──────────────┘                    └────────────────┘
//! ```

pub mod analytics;
pub mod broker;
pub mod exchange;
pub mod graph;
pub mod resources;

// Re-export commonly used types
pub use analytics::{AnalyticsError, ConversationAnalytics};
pub use broker::{BrokerError, BrokerManager, HandlerError, MessageHandler, SubscriptionOptions};
pub use exchange::Exchange;
pub use graph::{BasicAuth, GraphDriver, GraphError, GraphSession, SessionConfig, Statement};
pub use resources::ResourceFactory;
