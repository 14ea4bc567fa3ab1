//! # One-shot Receive
//!
//! A `PendingMessage` is a chain subscription that completes with the first
//! matching message and then removes itself.
//!
//! ```text
//! SUBSCRIBED ──match──► COMPLETED      (node removed before the waiter wakes)
//!      │
//!      ├──timeout / drop──► UNSUBSCRIBED (node removed by the guard)
//!      │
//!      └──chain drained──► INTERRUPTED   (node removed by close_all)
//! ```
//!
//! Every exit path performs exactly one chain removal.

use crate::chain::{ListenerChain, Registration, Subscription};
use crate::errors::{CommunicatorError, Result};
use crate::filter::MessageFilter;
use crate::message::{IncomingMessage, MessageId};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Future resolving to the first message matching a filter.
///
/// Dropping it before completion cancels the receive and unsubscribes.
#[must_use = "a PendingMessage does nothing unless awaited"]
#[derive(Debug)]
pub struct PendingMessage {
    receiver: oneshot::Receiver<Arc<IncomingMessage>>,
    subscription: Subscription,
    request_id: Option<MessageId>,
}

impl PendingMessage {
    /// Subscribe a one-shot node for `filter`.
    pub(crate) fn subscribe(chain: &Arc<ListenerChain>, filter: MessageFilter) -> Self {
        let (tx, receiver) = oneshot::channel();
        let registration = Registration::new(chain);

        let sender = Mutex::new(Some(tx));
        let own = Arc::clone(&registration);
        chain.attach(
            &registration,
            filter,
            Arc::new(move |message: Arc<IncomingMessage>| {
                let Some(tx) = sender.lock().take() else {
                    return;
                };
                own.close();
                if tx.send(message).is_err() {
                    debug!("One-shot receiver gone before delivery");
                }
            }),
        );

        Self {
            receiver,
            subscription: Subscription::from_registration(registration),
            request_id: None,
        }
    }

    pub(crate) fn for_request(mut self, request_id: MessageId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// ID of the request this receive answers, if it was created by `request`.
    #[must_use]
    pub fn request_id(&self) -> Option<MessageId> {
        self.request_id
    }

    /// Whether the one-shot node is still waiting in the chain.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Wait at most `timeout` for the message.
    ///
    /// On timeout the subscription is removed before the error is returned.
    pub async fn wait(self, timeout: Duration) -> Result<IncomingMessage> {
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => Err(CommunicatorError::Timeout { timeout }),
        }
    }

    /// Block the current thread until the message arrives.
    ///
    /// For plain threads only; panics if called from inside an async runtime.
    pub fn blocking_wait(self) -> Result<IncomingMessage> {
        let Self {
            receiver,
            subscription,
            ..
        } = self;
        let result = receiver
            .blocking_recv()
            .map(Arc::unwrap_or_clone)
            .map_err(|_| CommunicatorError::Interrupted);
        drop(subscription);
        result
    }

    /// Block the current thread for at most `timeout`.
    ///
    /// Every exit path, timeout included, removes the subscription before
    /// returning. For plain threads only; panics if called from inside an
    /// async runtime.
    pub fn blocking_wait_timeout(self, timeout: Duration) -> Result<IncomingMessage> {
        block_on_deadline(self.wait(timeout))?
    }

    /// Cancel the receive. Equivalent to dropping it.
    pub fn cancel(self) {}
}

impl Future for PendingMessage {
    type Output = Result<IncomingMessage>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(message)) => Poll::Ready(Ok(Arc::unwrap_or_clone(message))),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CommunicatorError::Interrupted)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Drive `future` to completion on a throwaway timer-only runtime.
///
/// Used by the blocking forms that need a deadline; the caller's thread is
/// the only one involved.
pub(crate) fn block_on_deadline<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| {
            warn!(error = %e, "Failed to build runtime for blocking wait");
            CommunicatorError::WaitRuntime(e.to_string())
        })?;
    Ok(runtime.block_on(future))
}
