//! # Bus Messages
//!
//! Defines the records that flow through a Communicator.
//!
//! Payloads are opaque `serde_json::Value`s. The whole record derives serde so
//! a cluster transport can carry it unchanged; this crate never serializes.

use serde::{Deserialize, Serialize};
use shared_objects::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identity of the node that sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Fresh random node identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier, unique within one bus instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Raw value.
    #[must_use]
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// What a message expects from its receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Expects a `Response` carrying the same message ID.
    Request,
    /// Answer to a `Request`.
    Response,
    /// One-way notification.
    Signal,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
            Self::Signal => write!(f, "signal"),
        }
    }
}

/// A message as seen by its receivers. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    payload: Value,
    sender: NodeId,
    message_id: MessageId,
    /// Milliseconds since the Unix epoch.
    timestamp: u64,
    message_type: MessageType,
}

impl IncomingMessage {
    /// Build a message stamped with the current time.
    #[must_use]
    pub fn new(
        payload: Value,
        sender: NodeId,
        message_id: MessageId,
        message_type: MessageType,
    ) -> Self {
        Self {
            payload,
            sender,
            message_id,
            timestamp: current_timestamp_ms(),
            message_type,
        }
    }

    /// Application payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Sending node.
    #[must_use]
    pub fn sender(&self) -> NodeId {
        self.sender
    }

    /// Message ID assigned at send time.
    #[must_use]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Send time, milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Message type.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Whether this is a `Response` to `request_id`.
    #[must_use]
    pub fn is_response_to(&self, request_id: MessageId) -> bool {
        self.message_type == MessageType::Response && self.message_id == request_id
    }
}

fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
