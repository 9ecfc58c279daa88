//! The fixed registry of notification exchanges.
//!
//! Every conversation-intelligence event category is published on its own
//! exchange. The set is closed: adding a category means adding a variant,
//! and every `match` over [`Exchange`] (including the handler constructor
//! table in `convograph-runtime`) stops compiling until it is handled.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A notification exchange and the event category it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Conversation lifecycle (started, ended, metadata changes)
    Conversation,
    /// Named entities detected in speech
    Entity,
    /// Action items, questions and follow-ups
    Insight,
    /// Transcribed messages
    Message,
    /// Topics discussed
    Topic,
    /// Tracker (keyword/phrase) matches
    Tracker,
}

impl Exchange {
    /// Every exchange, in registration order.
    pub const ALL: [Self; 6] = [
        Self::Conversation,
        Self::Entity,
        Self::Insight,
        Self::Message,
        Self::Topic,
        Self::Tracker,
    ];

    /// Broker-side exchange name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Entity => "entity",
            Self::Insight => "insight",
            Self::Message => "message",
            Self::Topic => "topic",
            Self::Tracker => "tracker",
        }
    }

    /// Look up an exchange by its broker-side name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|exchange| exchange.name() == name)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
