//! # Shared Bus - Cluster-ready Message Bus
//!
//! The Communicator shared object: one-way signals, typed messages, blocking
//! and future-based receive, message boxes and request/reply correlation, all
//! on top of a single listener chain per bus.
//!
//! ## Message Flow
//!
//! ```text
//! ┌──────────────┐  send_message()   ┌────────────────┐  execute()  ┌──────────────┐
//! │    Sender    │ ────────────────► │ ListenerChain  │ ──────────► │   Executor   │
//! │              │  (returns at once)│ filter walk,   │             │ runs delivery│
//! └──────────────┘                   │ shared lock    │             │ off-thread   │
//!                                    └────────────────┘             └──────┬───────┘
//!                                                                          │
//!                         listener callback / message box / one-shot ◄─────┘
//! ```
//!
//! ## Guarantees
//!
//! - A subscription never sees messages dispatched before it was linked.
//! - Each matching subscription gets each message exactly once.
//! - Senders never run listener code and never wait for listeners.
//! - Every receive with a deadline leaves the chain as it found it.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod chain;
pub mod communicator;
pub mod errors;
pub mod executor;
pub mod filter;
pub mod mailbox;
pub mod message;
pub mod pending;

// Re-export main types
pub use chain::{ListenerChain, Subscription};
pub use communicator::{BusContext, Communicator, CommunicatorKind, LocalCommunicator, MessageCallback};
pub use errors::{CommunicatorError, Result};
pub use executor::{DeliveryExecutor, DeliveryTask, LocalExecutor, TokioExecutor};
pub use filter::MessageFilter;
pub use mailbox::MessageBox;
pub use message::{IncomingMessage, MessageId, MessageType, NodeId};
pub use pending::PendingMessage;

/// Default wait for `send_request` callers that have no deadline of their own.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default capacity of bounded message boxes.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1000;
