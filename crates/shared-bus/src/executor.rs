//! # Delivery Executors
//!
//! Listener code never runs on the thread that sends a message. Dispatch
//! hands each matched delivery to a `DeliveryExecutor`, which runs it later on
//! a thread of its own.
//!
//! Executors are explicit dependencies: a Communicator is built with one, and
//! whoever builds the executor owns its shutdown. There is no process-wide
//! fallback instance.

use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One unit of delivery work.
pub type DeliveryTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs delivery tasks off the dispatching thread.
pub trait DeliveryExecutor: Send + Sync {
    /// Schedule `task`. Must not run it on the calling thread.
    fn execute(&self, task: DeliveryTask);

    /// Stop accepting work and release worker resources.
    fn shutdown(&self) {}
}

/// Run `task`, containing any panic to this one delivery.
pub(crate) fn run_contained(task: DeliveryTask) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(task)) {
        warn!(reason = panic_message(panic.as_ref()), "Delivery action panicked");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Worker lifecycle of a `LocalExecutor`.
enum WorkerState {
    /// No task submitted yet.
    Idle,
    /// Worker thread draining the queue.
    Running {
        sender: mpsc::UnboundedSender<DeliveryTask>,
        handle: JoinHandle<()>,
        thread_id: ThreadId,
    },
    /// Shut down; further tasks are dropped.
    Stopped,
}

/// Single-thread executor that starts its worker on first use.
///
/// Tasks run in submission order.
pub struct LocalExecutor {
    thread_name: String,
    state: Mutex<WorkerState>,
}

impl LocalExecutor {
    /// Default worker thread name.
    pub const DEFAULT_THREAD_NAME: &'static str = "shared-bus-delivery";

    /// Create an executor; no thread is started until the first task.
    #[must_use]
    pub fn new() -> Self {
        Self::with_thread_name(Self::DEFAULT_THREAD_NAME)
    }

    /// Create an executor whose worker thread carries `thread_name`.
    #[must_use]
    pub fn with_thread_name(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            state: Mutex::new(WorkerState::Idle),
        }
    }

    /// Whether the worker thread has been started and not shut down.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), WorkerState::Running { .. })
    }

    fn start_worker(&self) -> Option<WorkerState> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<DeliveryTask>();
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                while let Some(task) = receiver.blocking_recv() {
                    run_contained(task);
                }
                debug!("Delivery worker drained and exiting");
            });

        match spawned {
            Ok(handle) => {
                info!(thread = %self.thread_name, "Delivery worker started");
                let thread_id = handle.thread().id();
                Some(WorkerState::Running {
                    sender,
                    handle,
                    thread_id,
                })
            }
            Err(e) => {
                error!(thread = %self.thread_name, error = %e, "Failed to spawn delivery worker");
                None
            }
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryExecutor for LocalExecutor {
    fn execute(&self, task: DeliveryTask) {
        let mut state = self.state.lock();

        if matches!(*state, WorkerState::Idle) {
            match self.start_worker() {
                Some(running) => *state = running,
                None => return,
            }
        }

        match &*state {
            WorkerState::Running { sender, .. } => {
                if sender.send(task).is_err() {
                    warn!(thread = %self.thread_name, "Delivery worker gone, task dropped");
                }
            }
            WorkerState::Stopped => {
                debug!(thread = %self.thread_name, "Executor stopped, task dropped");
            }
            WorkerState::Idle => {}
        }
    }

    fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), WorkerState::Stopped);

        if let WorkerState::Running {
            sender,
            handle,
            thread_id,
        } = previous
        {
            // Closing the queue lets the worker finish what is already queued.
            drop(sender);
            if thread_id == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!(thread = %self.thread_name, "Delivery worker terminated abnormally");
            }
            info!(thread = %self.thread_name, "Delivery worker stopped");
        }
    }
}

impl Drop for LocalExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for LocalExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalExecutor")
            .field("thread_name", &self.thread_name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Executor spawning each delivery as a task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Executor on the given runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Executor on the runtime of the calling context, if there is one.
    #[must_use]
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl DeliveryExecutor for TokioExecutor {
    fn execute(&self, task: DeliveryTask) {
        self.handle.spawn(async move { run_contained(task) });
    }
}
