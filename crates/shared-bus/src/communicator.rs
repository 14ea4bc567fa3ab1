//! # Communicator
//!
//! Named message bus built on a `ListenerChain`.
//!
//! ## Request / Reply
//!
//! ```text
//! requester                         chain                         responder
//!    │ new_message_id() = n           │                               │
//!    │ receive(response_with_id(n)) ─►│ one-shot node linked          │
//!    │ send(Request, n) ─────────────►│ dispatch ────────────────────►│
//!    │                                │◄──────── reply(Response, n) ──│
//!    │◄── one-shot completes, node ───│                               │
//!    │    removed                     │                               │
//! ```
//!
//! The one-shot subscription is always linked before the request goes out, so
//! a response can never race past its waiter.

use crate::chain::{ListenerChain, Subscription};
use crate::errors::Result;
use crate::executor::{DeliveryExecutor, LocalExecutor};
use crate::filter::MessageFilter;
use crate::mailbox::MessageBox;
use crate::message::{IncomingMessage, MessageId, MessageType, NodeId};
use crate::pending::PendingMessage;
use async_trait::async_trait;
use shared_objects::{
    Counter, LocalCounter, ObjectKind, SharedObject, SharedObjectId, SharedObjectKind, Value,
};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Persistent listener callback.
pub type MessageCallback = Arc<dyn Fn(&IncomingMessage) + Send + Sync>;

/// Publish/subscribe message bus with request/reply correlation.
#[async_trait]
pub trait Communicator: SharedObject {
    /// Identity stamped as sender on every outgoing message.
    fn node_id(&self) -> NodeId;

    /// Next message ID. Strictly increasing and unique for this bus.
    fn new_message_id(&self) -> MessageId;

    /// Dispatch a message with an explicit ID. Returns immediately.
    fn send_message_with_id(&self, payload: Value, message_type: MessageType, message_id: MessageId);

    /// Dispatch a message under a fresh ID and return that ID.
    fn send_message(&self, payload: Value, message_type: MessageType) -> MessageId {
        let message_id = self.new_message_id();
        self.send_message_with_id(payload, message_type, message_id);
        message_id
    }

    /// Send a one-way notification.
    fn send_signal(&self, payload: Value) -> MessageId {
        self.send_message(payload, MessageType::Signal)
    }

    /// Answer `request` with a `Response` carrying the same ID.
    fn reply(&self, request: &IncomingMessage, payload: Value) {
        self.send_message_with_id(payload, MessageType::Response, request.message_id());
    }

    /// Register a persistent listener. It stays subscribed until the returned
    /// handle is closed or dropped.
    fn add_message_listener(&self, callback: MessageCallback, filter: MessageFilter) -> Subscription;

    /// Subscribe an unbounded message box.
    fn create_message_box(&self, filter: MessageFilter) -> MessageBox;

    /// Subscribe a box that drops messages beyond `capacity`.
    fn create_bounded_message_box(&self, capacity: usize, filter: MessageFilter)
        -> Result<MessageBox>;

    /// One-shot receive of the first message matching `filter`.
    fn receive(&self, filter: MessageFilter) -> PendingMessage;

    /// Receive the first matching message, waiting at most `timeout`.
    async fn receive_message(
        &self,
        filter: MessageFilter,
        timeout: Duration,
    ) -> Result<IncomingMessage> {
        self.receive(filter).wait(timeout).await
    }

    /// Send `payload` as a request and return the pending response.
    fn request(&self, payload: Value) -> PendingMessage {
        let request_id = self.new_message_id();
        let pending = self
            .receive(MessageFilter::response_with_message_id(request_id))
            .for_request(request_id);
        self.send_message_with_id(payload, MessageType::Request, request_id);
        pending
    }

    /// Send a request and wait at most `timeout` for its response.
    async fn send_request(&self, payload: Value, timeout: Duration) -> Result<IncomingMessage> {
        self.request(payload).wait(timeout).await
    }

    /// Plain-thread form of `send_request`. Panics inside an async runtime.
    fn send_request_blocking(&self, payload: Value, timeout: Duration) -> Result<IncomingMessage> {
        self.request(payload).blocking_wait_timeout(timeout)
    }

    /// Messages dispatched so far.
    fn messages_sent(&self) -> u64;

    /// Live subscriptions (listeners, boxes and pending receives).
    fn subscriber_count(&self) -> usize;
}

/// Dependencies of a process-local Communicator.
#[derive(Clone)]
pub struct BusContext {
    node_id: NodeId,
    executor: Arc<dyn DeliveryExecutor>,
}

impl BusContext {
    /// Context with an explicit identity and executor.
    #[must_use]
    pub fn new(node_id: NodeId, executor: Arc<dyn DeliveryExecutor>) -> Self {
        Self { node_id, executor }
    }

    /// Fresh identity with its own `LocalExecutor`.
    #[must_use]
    pub fn local() -> Self {
        Self::new(NodeId::random(), Arc::new(LocalExecutor::new()))
    }

    /// Node identity.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Delivery executor.
    #[must_use]
    pub fn executor(&self) -> &Arc<dyn DeliveryExecutor> {
        &self.executor
    }
}

impl fmt::Debug for BusContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusContext")
            .field("node_id", &self.node_id)
            .finish_non_exhaustive()
    }
}

/// Process-local Communicator.
pub struct LocalCommunicator {
    name: String,
    node_id: NodeId,
    ids: LocalCounter,
    chain: Arc<ListenerChain>,
    sent: AtomicU64,
}

impl LocalCommunicator {
    /// Create a bus named `name` using `context`'s identity and executor.
    #[must_use]
    pub fn new(name: impl Into<String>, context: &BusContext) -> Self {
        let name = name.into();
        Self {
            ids: LocalCounter::new(format!("{name}.message-ids")),
            name,
            node_id: context.node_id,
            chain: ListenerChain::new(Arc::clone(&context.executor)),
            sent: AtomicU64::new(0),
        }
    }
}

impl SharedObject for LocalCommunicator {
    fn name(&self) -> &str {
        &self.name
    }

    fn release(&self) {
        let removed = self.chain.close_all();
        info!(name = %self.name, removed, "Communicator released");
    }
}

#[async_trait]
impl Communicator for LocalCommunicator {
    fn node_id(&self) -> NodeId {
        self.node_id
    }

    fn new_message_id(&self) -> MessageId {
        MessageId(self.ids.get_and_increment())
    }

    fn send_message_with_id(&self, payload: Value, message_type: MessageType, message_id: MessageId) {
        let message = IncomingMessage::new(payload, self.node_id, message_id, message_type);
        let matched = self.chain.dispatch(message);
        self.sent.fetch_add(1, Ordering::Relaxed);
        debug!(
            name = %self.name,
            message_id = message_id.value(),
            %message_type,
            matched,
            "Message dispatched"
        );
    }

    fn add_message_listener(&self, callback: MessageCallback, filter: MessageFilter) -> Subscription {
        self.chain.subscribe(filter, move |message| callback(&message))
    }

    fn create_message_box(&self, filter: MessageFilter) -> MessageBox {
        MessageBox::unbounded(&self.chain, filter)
    }

    fn create_bounded_message_box(
        &self,
        capacity: usize,
        filter: MessageFilter,
    ) -> Result<MessageBox> {
        MessageBox::bounded(&self.chain, capacity, filter)
    }

    fn receive(&self, filter: MessageFilter) -> PendingMessage {
        PendingMessage::subscribe(&self.chain, filter)
    }

    fn messages_sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    fn subscriber_count(&self) -> usize {
        self.chain.len()
    }
}

impl fmt::Debug for LocalCommunicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCommunicator")
            .field("name", &self.name)
            .field("node_id", &self.node_id)
            .field("chain", &self.chain)
            .finish()
    }
}

/// Kind marker for Communicator repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommunicatorKind;

impl SharedObjectKind for CommunicatorKind {
    const KIND: ObjectKind = ObjectKind::Communicator;
    type Object = dyn Communicator;
    type Context = BusContext;

    fn create_default_implementation(
        id: &SharedObjectId<Self>,
        context: &BusContext,
    ) -> Arc<dyn Communicator> {
        Arc::new(LocalCommunicator::new(id.name(), context))
    }
}
