//! # Message Filters
//!
//! Predicates deciding which subscriptions a message is delivered to.
//! Filters are cheap to clone and compose with `and`, `or` and `negate`.

use crate::message::{IncomingMessage, MessageId, MessageType, NodeId};
use std::fmt;
use std::sync::Arc;

type Predicate = dyn Fn(&IncomingMessage) -> bool + Send + Sync;

/// Shareable message predicate.
#[derive(Clone)]
pub struct MessageFilter {
    predicate: Arc<Predicate>,
}

impl MessageFilter {
    /// Filter from an arbitrary predicate.
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&IncomingMessage) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Matches every message.
    #[must_use]
    pub fn all() -> Self {
        Self::custom(|_| true)
    }

    /// Matches nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::custom(|_| false)
    }

    /// Matches messages of `message_type`.
    #[must_use]
    pub fn of_type(message_type: MessageType) -> Self {
        Self::custom(move |msg| msg.message_type() == message_type)
    }

    /// Matches messages sent by `sender`.
    #[must_use]
    pub fn from_sender(sender: NodeId) -> Self {
        Self::custom(move |msg| msg.sender() == sender)
    }

    /// Matches any message carrying `id`.
    #[must_use]
    pub fn with_message_id(id: MessageId) -> Self {
        Self::custom(move |msg| msg.message_id() == id)
    }

    /// Matches the `Response` to request `id`.
    #[must_use]
    pub fn response_with_message_id(id: MessageId) -> Self {
        Self::custom(move |msg| msg.is_response_to(id))
    }

    /// Both filters match.
    #[must_use]
    pub fn and(self, other: MessageFilter) -> Self {
        Self::custom(move |msg| self.matches(msg) && other.matches(msg))
    }

    /// Either filter matches.
    #[must_use]
    pub fn or(self, other: MessageFilter) -> Self {
        Self::custom(move |msg| self.matches(msg) || other.matches(msg))
    }

    /// Inverse of this filter.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::custom(move |msg| !self.matches(msg))
    }

    /// Evaluate the filter.
    #[must_use]
    pub fn matches(&self, message: &IncomingMessage) -> bool {
        (self.predicate)(message)
    }
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageFilter").finish_non_exhaustive()
    }
}
