//! # Message Boxes
//!
//! A `MessageBox` is a persistent subscription whose deliveries land in a
//! queue the owner drains at its own pace.
//!
//! - Unbounded boxes accept everything.
//! - Bounded boxes drop messages that arrive while the queue is full and
//!   count them; the sender is never slowed down.
//!
//! Closing (or dropping) the box unsubscribes it. Messages already queued can
//! still be drained after `close()`.

use crate::chain::{ListenerChain, Registration, Subscription};
use crate::errors::{CommunicatorError, Result};
use crate::filter::MessageFilter;
use crate::message::IncomingMessage;
use crate::pending::block_on_deadline;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio_stream::Stream;
use tracing::warn;

enum Queue {
    Bounded(mpsc::Receiver<IncomingMessage>),
    Unbounded(mpsc::UnboundedReceiver<IncomingMessage>),
}

/// Queue-backed subscription.
#[must_use = "dropping a MessageBox unsubscribes it"]
pub struct MessageBox {
    queue: Queue,
    subscription: Subscription,
    dropped: Arc<AtomicU64>,
    capacity: Option<usize>,
}

impl MessageBox {
    /// Subscribe an unbounded box.
    pub(crate) fn unbounded(chain: &Arc<ListenerChain>, filter: MessageFilter) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let registration = Registration::new(chain);
        chain.attach(
            &registration,
            filter,
            Arc::new(move |message: Arc<IncomingMessage>| {
                // Closed means the box is shutting down.
                let _ = tx.send(Arc::unwrap_or_clone(message));
            }),
        );

        Self {
            queue: Queue::Unbounded(rx),
            subscription: Subscription::from_registration(registration),
            dropped: Arc::new(AtomicU64::new(0)),
            capacity: None,
        }
    }

    /// Subscribe a box holding at most `capacity` undelivered messages.
    pub(crate) fn bounded(
        chain: &Arc<ListenerChain>,
        capacity: usize,
        filter: MessageFilter,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(CommunicatorError::InvalidCapacity);
        }

        let (tx, rx) = mpsc::channel(capacity);
        let dropped = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&dropped);
        let registration = Registration::new(chain);
        chain.attach(
            &registration,
            filter,
            Arc::new(move |message: Arc<IncomingMessage>| {
                match tx.try_send(Arc::unwrap_or_clone(message)) {
                    Ok(()) | Err(TrySendError::Closed(_)) => {}
                    Err(TrySendError::Full(message)) => {
                        let total = counter.fetch_add(1, Ordering::Relaxed) + 1;
                        warn!(
                            message_id = message.message_id().value(),
                            capacity,
                            dropped = total,
                            "Message box full, message dropped"
                        );
                    }
                }
            }),
        );

        Ok(Self {
            queue: Queue::Bounded(rx),
            subscription: Subscription::from_registration(registration),
            dropped,
            capacity: Some(capacity),
        })
    }

    /// Next message, waiting if the queue is empty.
    ///
    /// Returns `None` once the box is closed and drained.
    pub async fn recv(&mut self) -> Option<IncomingMessage> {
        match &mut self.queue {
            Queue::Bounded(rx) => rx.recv().await,
            Queue::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Next message if one is queued.
    pub fn try_recv(&mut self) -> Option<IncomingMessage> {
        let result = match &mut self.queue {
            Queue::Bounded(rx) => rx.try_recv(),
            Queue::Unbounded(rx) => rx.try_recv(),
        };
        match result {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Next message, waiting at most `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<IncomingMessage> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(CommunicatorError::Closed),
            Err(_) => Err(CommunicatorError::Timeout { timeout }),
        }
    }

    /// Blocking receive for plain threads. Panics inside an async runtime.
    pub fn blocking_recv(&mut self) -> Option<IncomingMessage> {
        match &mut self.queue {
            Queue::Bounded(rx) => rx.blocking_recv(),
            Queue::Unbounded(rx) => rx.blocking_recv(),
        }
    }

    /// Blocking receive for plain threads, waiting at most `timeout`.
    ///
    /// The box stays subscribed after a timeout. Panics inside an async
    /// runtime.
    pub fn blocking_recv_timeout(&mut self, timeout: Duration) -> Result<IncomingMessage> {
        block_on_deadline(self.recv_timeout(timeout))?
    }

    /// Unsubscribe and stop accepting messages. Idempotent.
    pub fn close(&mut self) {
        self.subscription.close();
        match &mut self.queue {
            Queue::Bounded(rx) => rx.close(),
            Queue::Unbounded(rx) => rx.close(),
        }
    }

    /// Whether the box is still subscribed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Messages discarded because the box was full.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Capacity of a bounded box, `None` when unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl Stream for MessageBox {
    type Item = IncomingMessage;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match &mut self.get_mut().queue {
            Queue::Bounded(rx) => rx.poll_recv(cx),
            Queue::Unbounded(rx) => rx.poll_recv(cx),
        }
    }
}

impl std::fmt::Debug for MessageBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBox")
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count())
            .field("active", &self.is_active())
            .finish()
    }
}
