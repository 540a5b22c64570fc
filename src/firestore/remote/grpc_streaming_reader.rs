use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;

use crate::firestore::error::FirestoreResult;
use crate::firestore::remote::grpc_call::{GrpcCall, ResponseHeaders};
use crate::firestore::remote::grpc_completion::{CompletionKind, GrpcCompletion, PendingCompletion};
use crate::firestore::remote::grpc_status::GrpcStatus;
use crate::util::assert::{hard_assert, hard_fail};
use crate::util::async_queue::AsyncQueue;

/// Receives every response message on success, or the mapped call status on failure.
pub type StreamingReaderCallback = Box<dyn FnOnce(FirestoreResult<Vec<Bytes>>) + Send + 'static>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReaderState {
    NotStarted,
    Started,
    Finished,
}

/// Sends one request on a streaming call and collects every response until the server closes
/// the stream.
///
/// Operations are issued strictly in sequence: the request write, then one read at a time while
/// reads succeed, then finish. Transport completions are always handled on the worker queue.
/// The public methods may be called from any thread; reader state sits behind a mutex that is
/// never held while the callback runs.
///
/// The callback runs on the worker queue when the call finishes on its own, and on the thread
/// calling [`finish_and_notify`] otherwise. It may drop the reader.
///
/// Dropping a reader that has not finished cancels the call without notifying.
///
/// [`finish_and_notify`]: GrpcStreamingReader::finish_and_notify
pub struct GrpcStreamingReader {
    inner: Arc<Mutex<ReaderInner>>,
}

type Notification = (StreamingReaderCallback, FirestoreResult<Vec<Bytes>>);

struct ReaderInner {
    rpc_name: String,
    state: ReaderState,
    call: Option<Box<dyn GrpcCall>>,
    worker_queue: AsyncQueue,
    this: Weak<Mutex<ReaderInner>>,
    responses: Vec<Bytes>,
    callback: Option<StreamingReaderCallback>,
    // Kept after the call is released.
    headers: ResponseHeaders,
}

impl GrpcStreamingReader {
    pub fn new(
        rpc_name: impl Into<String>,
        call: Box<dyn GrpcCall>,
        worker_queue: AsyncQueue,
    ) -> Self {
        let rpc_name = rpc_name.into();
        let inner = Arc::new_cyclic(|this| {
            Mutex::new(ReaderInner {
                rpc_name,
                state: ReaderState::NotStarted,
                call: Some(call),
                worker_queue,
                this: this.clone(),
                responses: Vec::new(),
                callback: None,
                headers: ResponseHeaders::new(),
            })
        });
        Self { inner }
    }

    /// Writes `request` and starts reading. May only be called once.
    #[track_caller]
    pub fn start<F>(&self, request: Bytes, callback: F)
    where
        F: FnOnce(FirestoreResult<Vec<Bytes>>) + Send + 'static,
    {
        let mut inner = self.lock();
        hard_assert(
            inner.state == ReaderState::NotStarted,
            format!("{}: GrpcStreamingReader can only be started once", inner.rpc_name),
        );
        log::debug!("{}: starting streaming read", inner.rpc_name);
        inner.state = ReaderState::Started;
        inner.callback = Some(Box::new(callback));
        inner.issue(CompletionKind::Write, Some(request));
    }

    /// Metadata sent by the server. Available once the reader has been started, including after
    /// it finished.
    #[track_caller]
    pub fn response_headers(&self) -> ResponseHeaders {
        let inner = self.lock();
        hard_assert(
            inner.state != ReaderState::NotStarted,
            "response headers requested before the reader was started",
        );
        match &inner.call {
            Some(call) => call.response_headers(),
            None => inner.headers.clone(),
        }
    }

    /// Cancels the call without invoking the callback. Safe to call in any state, any number of
    /// times.
    pub fn finish_immediately(&self) {
        let (call, callback) = {
            let mut inner = self.lock();
            match inner.state {
                ReaderState::Finished => return,
                ReaderState::NotStarted => {
                    inner.state = ReaderState::Finished;
                    (inner.release_call(), None)
                }
                ReaderState::Started => {
                    log::debug!("{}: finishing immediately", inner.rpc_name);
                    if let Some(call) = inner.call.as_mut() {
                        call.try_cancel();
                    }
                    inner.state = ReaderState::Finished;
                    inner.responses.clear();
                    (inner.release_call(), inner.callback.take())
                }
            }
        };
        // Dropped outside the lock: either may own the last handle to this reader.
        drop(call);
        drop(callback);
    }

    /// Cancels the call and reports `status` to the callback as if the server had finished with
    /// it. Does nothing once finished.
    #[track_caller]
    pub fn finish_and_notify(&self, status: GrpcStatus) {
        let notification = {
            let mut inner = self.lock();
            match inner.state {
                ReaderState::NotStarted => hard_fail(format!(
                    "{}: finish_and_notify called before the reader was started",
                    inner.rpc_name
                )),
                ReaderState::Finished => return,
                ReaderState::Started => {
                    if let Some(call) = inner.call.as_mut() {
                        call.try_cancel();
                    }
                    inner.finish(status)
                }
            }
        };
        notify(notification);
    }

    pub fn state(&self) -> ReaderState {
        self.lock().state
    }

    pub fn is_finished(&self) -> bool {
        self.state() == ReaderState::Finished
    }

    fn lock(&self) -> MutexGuard<'_, ReaderInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for GrpcStreamingReader {
    fn drop(&mut self) {
        self.finish_immediately();
    }
}

impl std::fmt::Debug for GrpcStreamingReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("GrpcStreamingReader")
            .field("rpc_name", &inner.rpc_name)
            .field("state", &inner.state)
            .field("responses", &inner.responses.len())
            .finish()
    }
}

impl ReaderInner {
    fn issue(&mut self, kind: CompletionKind, request: Option<Bytes>) {
        let pending = self.pending(kind);
        let Some(call) = self.call.as_mut() else {
            hard_fail(format!("{}: {kind:?} issued without a call", self.rpc_name));
        };
        match (kind, request) {
            (CompletionKind::Write, Some(request)) => call.start_write(request, pending),
            (CompletionKind::Read, None) => call.start_read(pending),
            (CompletionKind::Finish, None) => call.start_finish(pending),
            (kind, _) => hard_fail(format!("{kind:?} issued with a mismatched payload")),
        }
    }

    /// The returned completion hops back onto the worker queue and is ignored if the reader is
    /// gone by then.
    fn pending(&self, kind: CompletionKind) -> PendingCompletion {
        let reader = self.this.clone();
        let queue = self.worker_queue.clone();
        PendingCompletion::new(kind, move |completion| {
            queue.enqueue(move || dispatch(&reader, completion));
        })
    }

    fn on_completion(&mut self, completion: GrpcCompletion) -> Option<Notification> {
        if self.state != ReaderState::Started {
            log::debug!(
                "{}: ignoring {:?} completion in state {:?}",
                self.rpc_name,
                completion.kind(),
                self.state
            );
            return None;
        }

        match completion {
            GrpcCompletion::Write(true) => {
                self.issue(CompletionKind::Read, None);
                None
            }
            GrpcCompletion::Write(false) => {
                log::debug!("{}: write failed, finishing", self.rpc_name);
                self.issue(CompletionKind::Finish, None);
                None
            }
            GrpcCompletion::Read(Some(message)) => {
                self.responses.push(message);
                self.issue(CompletionKind::Read, None);
                None
            }
            GrpcCompletion::Read(None) => {
                log::debug!(
                    "{}: no more messages after {} responses",
                    self.rpc_name,
                    self.responses.len()
                );
                self.issue(CompletionKind::Finish, None);
                None
            }
            GrpcCompletion::Finish(status) => self.finish(status),
        }
    }

    fn finish(&mut self, status: GrpcStatus) -> Option<Notification> {
        self.state = ReaderState::Finished;
        let _call = self.release_call();
        let responses = mem::take(&mut self.responses);
        let result = match status.to_error() {
            None => {
                log::debug!("{}: finished with {} responses", self.rpc_name, responses.len());
                Ok(responses)
            }
            Some(err) => {
                log::warn!("{}: call failed: {status}", self.rpc_name);
                Err(err)
            }
        };
        self.callback.take().map(|callback| (callback, result))
    }

    fn release_call(&mut self) -> Option<Box<dyn GrpcCall>> {
        let call = self.call.take();
        if let Some(call) = &call {
            self.headers = call.response_headers();
        }
        call
    }
}

fn dispatch(reader: &Weak<Mutex<ReaderInner>>, completion: GrpcCompletion) {
    let Some(inner) = reader.upgrade() else {
        log::debug!("dropping {:?} completion for a released reader", completion.kind());
        return;
    };
    let notification = inner
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .on_completion(completion);
    drop(inner);
    notify(notification);
}

fn notify(notification: Option<Notification>) {
    if let Some((callback, result)) = notification {
        callback(result);
    }
}
