//! A serial worker queue: tasks run one at a time, in enqueue order, on a dedicated thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use async_channel::{Receiver, Sender};
use futures::executor::block_on;

use crate::firestore::error::{internal_error, FirestoreResult};
use crate::util::assert::{hard_assert, hard_fail};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a worker queue. Clones share the same queue.
#[derive(Clone)]
pub struct AsyncQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    name: String,
    sender: Sender<Task>,
    thread_id: ThreadId,
}

impl AsyncQueue {
    /// Spawns the worker thread. The thread exits once every handle is dropped or the queue is
    /// shut down and drained.
    pub fn new(name: impl Into<String>) -> FirestoreResult<Self> {
        let name = name.into();
        let (sender, receiver) = async_channel::unbounded::<Task>();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(receiver))
            .map_err(|err| internal_error(format!("failed to spawn worker queue: {err}")))?;

        Ok(Self {
            inner: Arc::new(QueueInner {
                name,
                sender,
                thread_id: handle.thread().id(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Schedules `task` to run after every task already enqueued.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.sender.try_send(Box::new(task)).is_err() {
            log::error!("task dropped: worker queue '{}' is shut down", self.inner.name);
        }
    }

    /// Runs `task` on the queue and blocks until it returns. A panic inside `task` is resumed on
    /// the calling thread.
    ///
    /// Must not be called from the queue itself.
    #[track_caller]
    pub fn enqueue_blocking<F, R>(&self, task: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        hard_assert(
            !self.is_current_queue(),
            "enqueue_blocking called from the worker queue it targets",
        );

        let (result_tx, result_rx) = async_channel::bounded::<std::thread::Result<R>>(1);
        let wrapped: Task = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            let _ = result_tx.try_send(outcome);
        });
        if self.inner.sender.try_send(wrapped).is_err() {
            hard_fail(format!(
                "enqueue_blocking on shut down worker queue '{}'",
                self.inner.name
            ));
        }

        match block_on(result_rx.recv()) {
            Ok(Ok(value)) => value,
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => hard_fail(format!(
                "worker queue '{}' dropped a blocking task",
                self.inner.name
            )),
        }
    }

    /// Returns true when called from the worker thread.
    pub fn is_current_queue(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Stops accepting tasks. Already queued tasks still run.
    pub fn shutdown(&self) {
        self.inner.sender.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.sender.is_closed()
    }
}

impl std::fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("name", &self.inner.name)
            .finish()
    }
}

fn run_worker(receiver: Receiver<Task>) {
    while let Ok(task) = block_on(receiver.recv()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            log::error!("worker queue task panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
