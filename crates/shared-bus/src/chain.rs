//! # Listener Chain
//!
//! The subscriber list behind every Communicator subscription: persistent
//! listeners, message boxes and one-shot receives all become nodes here.
//!
//! ## Layout
//!
//! ```text
//!  slot 0            slot k             slot j            slot 1
//! ┌──────┐  next   ┌────────────┐ next ┌────────────┐ next ┌──────┐
//! │ Head │ ──────► │ Subscriber │ ───► │ Subscriber │ ───► │ Tail │
//! │      │ ◄────── │ filter/act │ ◄─── │ filter/act │ ◄─── │      │
//! └──────┘  prev   └────────────┘ prev └────────────┘ prev └──────┘
//! ```
//!
//! Nodes live in an arena and link by index. The two sentinels are never
//! removed, so every subscriber always has both neighbours and unlinking is
//! O(1). Freed slots are reused; each reuse bumps the slot generation so a
//! stale key can never unlink its successor.
//!
//! ## Locking
//!
//! - `subscribe` / `close` / `close_all`: exclusive lock.
//! - `dispatch`: shared lock, so concurrent senders never block each other.
//!
//! Dispatch only evaluates filters under the lock. Matched deliveries go to
//! the executor, which means a listener may send (or unsubscribe) from inside
//! its own callback without deadlocking. Filters themselves run under the
//! shared lock and must not call back into the bus.
//!
//! ## Removal token
//!
//! Each node's `Registration` holds `Some(key)` while the node is linked.
//! Taking the key out of the registration is the permission to unlink: the
//! first `close()` wins, every later or concurrent call sees `None` and does
//! nothing.

use crate::executor::DeliveryExecutor;
use crate::filter::MessageFilter;
use crate::message::IncomingMessage;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

const HEAD: usize = 0;
const TAIL: usize = 1;

/// Delivery action of a subscriber node.
pub(crate) type DeliveryAction = Arc<dyn Fn(Arc<IncomingMessage>) + Send + Sync>;

enum NodeKind {
    Head,
    Tail,
    Subscriber {
        filter: MessageFilter,
        action: DeliveryAction,
        registration: Arc<Registration>,
    },
    /// Free slot waiting for reuse.
    Vacant,
}

struct Node {
    kind: NodeKind,
    prev: usize,
    next: usize,
    generation: u64,
}

/// Generation-tagged slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeKey {
    index: usize,
    generation: u64,
}

struct Slots {
    nodes: Vec<Node>,
    free: Vec<usize>,
    live: usize,
    /// Set by `close_all`; later attaches are refused.
    closed: bool,
}

impl Slots {
    fn new() -> Self {
        Self {
            nodes: vec![
                Node {
                    kind: NodeKind::Head,
                    prev: HEAD,
                    next: TAIL,
                    generation: 0,
                },
                Node {
                    kind: NodeKind::Tail,
                    prev: HEAD,
                    next: TAIL,
                    generation: 0,
                },
            ],
            free: Vec::new(),
            live: 0,
            closed: false,
        }
    }

    fn link_before_tail(&mut self, kind: NodeKind) -> NodeKey {
        let prev = self.nodes[TAIL].prev;

        let index = match self.free.pop() {
            Some(index) => {
                let node = &mut self.nodes[index];
                node.kind = kind;
                node.prev = prev;
                node.next = TAIL;
                node.generation = node.generation.wrapping_add(1);
                index
            }
            None => {
                self.nodes.push(Node {
                    kind,
                    prev,
                    next: TAIL,
                    generation: 0,
                });
                self.nodes.len() - 1
            }
        };

        self.nodes[prev].next = index;
        self.nodes[TAIL].prev = index;
        self.live += 1;

        NodeKey {
            index,
            generation: self.nodes[index].generation,
        }
    }

    /// Unlink the node behind `key`, returning its contents so they can be
    /// dropped outside the lock. `None` if the key is stale.
    fn unlink(&mut self, key: NodeKey) -> Option<NodeKind> {
        let node = self.nodes.get(key.index)?;
        if node.generation != key.generation || !matches!(node.kind, NodeKind::Subscriber { .. }) {
            return None;
        }

        let (prev, next) = (node.prev, node.next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;

        let node = &mut self.nodes[key.index];
        let kind = std::mem::replace(&mut node.kind, NodeKind::Vacant);
        node.prev = key.index;
        node.next = key.index;

        self.free.push(key.index);
        self.live -= 1;
        Some(kind)
    }
}

/// Removal token shared by a node and the handles that may remove it.
pub(crate) struct Registration {
    chain: Weak<ListenerChain>,
    token: Mutex<Option<NodeKey>>,
}

impl Registration {
    pub(crate) fn new(chain: &Arc<ListenerChain>) -> Arc<Self> {
        Arc::new(Self {
            chain: Arc::downgrade(chain),
            token: Mutex::new(None),
        })
    }

    /// Unlink the node. Returns `true` only for the call that removed it.
    pub(crate) fn close(&self) -> bool {
        let Some(key) = self.token.lock().take() else {
            return false;
        };
        match self.chain.upgrade() {
            Some(chain) => chain.unlink(key),
            None => false,
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.token.lock().is_some()
    }
}

/// Handle to one chain subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    registration: Arc<Registration>,
}

impl Subscription {
    pub(crate) fn from_registration(registration: Arc<Registration>) -> Self {
        Self { registration }
    }

    /// Detach from the chain.
    ///
    /// Safe to call any number of times from any thread; only the first call
    /// unlinks, and only that call returns `true`.
    pub fn close(&self) -> bool {
        self.registration.close()
    }

    /// Whether the subscription is still linked into its chain.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration.is_attached()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registration.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Sentinel-bounded subscriber list with executor-based delivery.
pub struct ListenerChain {
    slots: RwLock<Slots>,
    executor: Arc<dyn DeliveryExecutor>,
}

impl ListenerChain {
    /// Create an empty chain delivering through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn DeliveryExecutor>) -> Arc<Self> {
        Arc::new(Self {
            slots: RwLock::new(Slots::new()),
            executor,
        })
    }

    /// Link a subscriber immediately before the tail.
    ///
    /// Messages dispatched before this call returns are never delivered to
    /// the new subscriber.
    pub fn subscribe<F>(self: &Arc<Self>, filter: MessageFilter, action: F) -> Subscription
    where
        F: Fn(Arc<IncomingMessage>) + Send + Sync + 'static,
    {
        let registration = Registration::new(self);
        self.attach(&registration, filter, Arc::new(action));
        Subscription::from_registration(registration)
    }

    /// Link a node for an existing registration. A closed chain refuses the
    /// node and the registration stays detached.
    pub(crate) fn attach(
        &self,
        registration: &Arc<Registration>,
        filter: MessageFilter,
        action: DeliveryAction,
    ) -> bool {
        let mut slots = self.slots.write();
        if slots.closed {
            drop(slots);
            warn!("Subscribe on a released listener chain, subscription is inactive");
            return false;
        }

        let key = slots.link_before_tail(NodeKind::Subscriber {
            filter,
            action,
            registration: Arc::clone(registration),
        });
        *registration.token.lock() = Some(key);
        debug!(subscribers = slots.live, "Listener subscribed");
        true
    }

    fn unlink(&self, key: NodeKey) -> bool {
        let removed = {
            let mut slots = self.slots.write();
            let removed = slots.unlink(key);
            if removed.is_some() {
                debug!(subscribers = slots.live, "Listener unsubscribed");
            }
            removed
        };
        removed.is_some()
    }

    /// Hand `message` to every matching subscriber, in chain order.
    ///
    /// Returns the number of matches. Delivery itself happens later on the
    /// executor.
    pub fn dispatch(&self, message: IncomingMessage) -> usize {
        let message = Arc::new(message);
        let slots = self.slots.read();

        let mut matched = 0;
        let mut cursor = slots.nodes[HEAD].next;
        while cursor != TAIL {
            let node = &slots.nodes[cursor];
            if let NodeKind::Subscriber { filter, action, .. } = &node.kind {
                if filter.matches(&message) {
                    let action = Arc::clone(action);
                    let message = Arc::clone(&message);
                    self.executor.execute(Box::new(move || action(message)));
                    matched += 1;
                }
            }
            cursor = node.next;
        }

        matched
    }

    /// Unlink every subscriber and refuse new ones.
    ///
    /// Returns the number of nodes removed by this call.
    pub fn close_all(&self) -> usize {
        let removed = {
            let mut slots = self.slots.write();
            slots.closed = true;

            let mut removed = Vec::new();
            let mut cursor = slots.nodes[HEAD].next;
            while cursor != TAIL {
                let next = slots.nodes[cursor].next;
                let registration = match &slots.nodes[cursor].kind {
                    NodeKind::Subscriber { registration, .. } => Arc::clone(registration),
                    _ => {
                        cursor = next;
                        continue;
                    }
                };

                // A concurrent close() that already took the token unlinks the
                // node itself once it gets the lock.
                let taken = registration.token.lock().take();
                if let Some(kind) = taken.and_then(|key| slots.unlink(key)) {
                    removed.push(kind);
                }
                cursor = next;
            }
            removed
        };

        if !removed.is_empty() {
            debug!(removed = removed.len(), "Listener chain drained");
        }
        removed.len()
    }

    /// Number of linked subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().live
    }

    /// Whether no subscriber is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `close_all` has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slots.read().closed
    }
}

impl fmt::Debug for ListenerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read();
        f.debug_struct("ListenerChain")
            .field("subscribers", &slots.live)
            .field("closed", &slots.closed)
            .finish()
    }
}
