//! # Shared Object Provider
//!
//! One entry point handing out every kind of shared object by name.
//!
//! ```text
//! ┌──────────────────────────── LocalSharedObjects ────────────────────────────┐
//! │                                                                            │
//! │  counters ──► SharedObjectRepository<CounterKind>                          │
//! │  boxes    ──► SharedObjectRepository<BoxKind>                              │
//! │  stores   ──► SharedObjectRepository<StoreKind>                            │
//! │  buses    ──► SharedObjectRepository<CommunicatorKind> ──► BusContext      │
//! │                                                              │             │
//! │                                         node id + delivery executor        │
//! └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The provider owns its executor. Dropping the provider releases every
//! object and then shuts the executor down.

use crate::config::{ExecutorMode, RuntimeConfig};
use crate::errors::RuntimeError;
use shared_bus::{
    BusContext, Communicator, CommunicatorKind, DeliveryExecutor, IncomingMessage, LocalExecutor,
    MessageBox, MessageFilter, NodeId, TokioExecutor,
};
use shared_objects::{
    BoxKind, Counter, CounterKind, KeyValueStore, ObjectKind, RepositoryError, SharedBox,
    SharedObjectRepository, StoreKind, Value,
};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Access to named shared objects of every kind.
pub trait SharedObjectProvider: Send + Sync {
    /// Counter named `name`, created on first use.
    fn counter(&self, name: &str) -> Result<Arc<dyn Counter>, RepositoryError>;

    /// Box named `name`, created on first use.
    fn shared_box(&self, name: &str) -> Result<Arc<dyn SharedBox>, RepositoryError>;

    /// Key/value store named `name`, created on first use.
    fn store(&self, name: &str) -> Result<Arc<dyn KeyValueStore>, RepositoryError>;

    /// Communicator named `name`, created on first use.
    fn communicator(&self, name: &str) -> Result<Arc<dyn Communicator>, RepositoryError>;

    /// Release one object. Returns `false` if nothing was registered.
    fn release(&self, kind: ObjectKind, name: &str) -> bool;

    /// Release every object of every kind.
    fn release_all(&self);
}

/// Process-local provider.
pub struct LocalSharedObjects {
    config: RuntimeConfig,
    node_id: NodeId,
    executor: Arc<dyn DeliveryExecutor>,
    counters: SharedObjectRepository<CounterKind>,
    boxes: SharedObjectRepository<BoxKind>,
    stores: SharedObjectRepository<StoreKind>,
    communicators: SharedObjectRepository<CommunicatorKind>,
}

impl LocalSharedObjects {
    /// Build a provider from `config`.
    ///
    /// `ExecutorMode::Tokio` must be called from inside a tokio runtime.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;

        let executor: Arc<dyn DeliveryExecutor> = match config.executor {
            ExecutorMode::Local => Arc::new(LocalExecutor::with_thread_name(format!(
                "{}-delivery",
                config.node_name
            ))),
            ExecutorMode::Tokio => Arc::new(TokioExecutor::current().ok_or(RuntimeError::NoRuntime)?),
        };

        Ok(Self::with_executor(config, executor))
    }

    /// Build a provider from environment configuration.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::new(RuntimeConfig::from_env())
    }

    /// Build a provider around an existing executor.
    ///
    /// The provider shuts `executor` down when it is dropped.
    pub fn with_executor(config: RuntimeConfig, executor: Arc<dyn DeliveryExecutor>) -> Self {
        let node_id = NodeId::random();
        let bus_context = BusContext::new(node_id, Arc::clone(&executor));

        info!(
            node = %config.node_name,
            %node_id,
            executor = %config.executor,
            "Shared object provider started"
        );

        Self {
            config,
            node_id,
            executor,
            counters: SharedObjectRepository::default(),
            boxes: SharedObjectRepository::default(),
            stores: SharedObjectRepository::default(),
            communicators: SharedObjectRepository::new(bus_context),
        }
    }

    /// Identity stamped on messages sent by this provider's communicators.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Send a request on the communicator `name` using the configured timeout.
    pub async fn send_request(
        &self,
        name: &str,
        payload: Value,
    ) -> Result<IncomingMessage, RuntimeError> {
        let communicator = self.communicator(name)?;
        let response = communicator
            .send_request(payload, self.config.request_timeout)
            .await?;
        Ok(response)
    }

    /// Bounded message box on the communicator `name` with the configured
    /// capacity.
    pub fn message_box(&self, name: &str, filter: MessageFilter) -> Result<MessageBox, RuntimeError> {
        let communicator = self.communicator(name)?;
        let inbox = communicator.create_bounded_message_box(self.config.mailbox_capacity, filter)?;
        Ok(inbox)
    }

    /// Number of live objects across all kinds.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.counters.len() + self.boxes.len() + self.stores.len() + self.communicators.len()
    }
}

impl SharedObjectProvider for LocalSharedObjects {
    fn counter(&self, name: &str) -> Result<Arc<dyn Counter>, RepositoryError> {
        self.counters.get_shared_object(name)
    }

    fn shared_box(&self, name: &str) -> Result<Arc<dyn SharedBox>, RepositoryError> {
        self.boxes.get_shared_object(name)
    }

    fn store(&self, name: &str) -> Result<Arc<dyn KeyValueStore>, RepositoryError> {
        self.stores.get_shared_object(name)
    }

    fn communicator(&self, name: &str) -> Result<Arc<dyn Communicator>, RepositoryError> {
        self.communicators.get_shared_object(name)
    }

    fn release(&self, kind: ObjectKind, name: &str) -> bool {
        match kind {
            ObjectKind::Counter => self.counters.release_shared_object(name),
            ObjectKind::Box => self.boxes.release_shared_object(name),
            ObjectKind::Store => self.stores.release_shared_object(name),
            ObjectKind::Communicator => self.communicators.release_shared_object(name),
        }
    }

    fn release_all(&self) {
        // Buses first so pending receives are interrupted before anything else
        // goes away.
        self.communicators.release_all();
        self.stores.release_all();
        self.boxes.release_all();
        self.counters.release_all();
        info!(node = %self.config.node_name, "All shared objects released");
    }
}

impl Drop for LocalSharedObjects {
    fn drop(&mut self) {
        self.release_all();
        self.executor.shutdown();
    }
}

impl fmt::Debug for LocalSharedObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSharedObjects")
            .field("node", &self.config.node_name)
            .field("node_id", &self.node_id)
            .field("counters", &self.counters)
            .field("boxes", &self.boxes)
            .field("stores", &self.stores)
            .field("communicators", &self.communicators)
            .finish()
    }
}
