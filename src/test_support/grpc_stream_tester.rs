use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::firestore::remote::grpc_call::{GrpcCall, ResponseHeaders};
use crate::firestore::remote::grpc_completion::{
    CompletionKind, CompletionQueue, GrpcCompletion, PendingCompletion,
};
use crate::firestore::remote::grpc_streaming_reader::GrpcStreamingReader;
use crate::util::async_queue::AsyncQueue;

#[derive(Default)]
struct FakeCallState {
    writes: Mutex<Vec<Bytes>>,
    cancelled: AtomicBool,
    headers: Mutex<ResponseHeaders>,
}

/// A call that parks every operation on the tester's completion queue until the test decides
/// how it completes.
pub struct FakeGrpcCall {
    completion_queue: CompletionQueue,
    state: Arc<FakeCallState>,
}

impl GrpcCall for FakeGrpcCall {
    fn start_write(&mut self, message: Bytes, completion: PendingCompletion) {
        self.state.writes.lock().unwrap().push(message);
        self.completion_queue.push(completion);
    }

    fn start_read(&mut self, completion: PendingCompletion) {
        self.completion_queue.push(completion);
    }

    fn start_finish(&mut self, completion: PendingCompletion) {
        self.completion_queue.push(completion);
    }

    fn try_cancel(&mut self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
    }

    fn response_headers(&self) -> ResponseHeaders {
        self.state.headers.lock().unwrap().clone()
    }
}

/// Drives readers deterministically: operations wait on a completion queue and the test
/// completes them one by one, letting the worker queue settle in between.
pub struct GrpcStreamTester {
    worker_queue: AsyncQueue,
    completion_queue: CompletionQueue,
    state: Arc<FakeCallState>,
}

impl GrpcStreamTester {
    pub fn new() -> Self {
        Self {
            worker_queue: AsyncQueue::new("grpc-stream-tester").expect("worker queue"),
            completion_queue: CompletionQueue::new(),
            state: Arc::new(FakeCallState::default()),
        }
    }

    pub fn worker_queue(&self) -> &AsyncQueue {
        &self.worker_queue
    }

    pub fn create_call(&self) -> FakeGrpcCall {
        FakeGrpcCall {
            completion_queue: self.completion_queue.clone(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn create_streaming_reader(&self) -> GrpcStreamingReader {
        GrpcStreamingReader::new(
            "FakeRpc",
            Box::new(self.create_call()),
            self.worker_queue.clone(),
        )
    }

    pub fn set_response_headers<I, K, V>(&self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        *self.state.headers.lock().unwrap() = headers
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
    }

    pub fn written_messages(&self) -> Vec<Bytes> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn was_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Blocks until every task already on the worker queue has run.
    pub fn wait_for_worker(&self) {
        self.worker_queue.enqueue_blocking(|| ());
    }

    /// Kinds of the operations currently waiting, oldest first.
    pub fn pending_kinds(&self) -> Vec<CompletionKind> {
        self.wait_for_worker();
        let mut pending = Vec::new();
        while let Some(next) = self.completion_queue.try_next() {
            pending.push(next);
        }
        let kinds = pending.iter().map(PendingCompletion::kind).collect();
        for next in pending {
            self.completion_queue.push(next);
        }
        kinds
    }

    /// Completes the next operations in order. Each completion must match the kind of the
    /// operation it completes.
    pub fn force_finish(&self, completions: Vec<GrpcCompletion>) {
        for completion in completions {
            let pending = self.next_pending();
            assert_eq!(
                pending.kind(),
                completion.kind(),
                "next pending operation does not match the forced completion"
            );
            pending.complete(completion);
        }
        self.wait_for_worker();
    }

    /// Completes operations with the first listed completion of the matching kind, whatever
    /// order the operations are issued in.
    pub fn force_finish_any_type_order(&self, mut completions: Vec<GrpcCompletion>) {
        while !completions.is_empty() {
            let pending = self.next_pending();
            let index = completions
                .iter()
                .position(|completion| completion.kind() == pending.kind())
                .unwrap_or_else(|| panic!("no forced completion for {:?}", pending.kind()));
            pending.complete(completions.remove(index));
        }
        self.wait_for_worker();
    }

    /// Hands each pending operation to `callback`, which completes it and returns whether to
    /// keep going.
    pub fn force_finish_with<F>(&self, mut callback: F)
    where
        F: FnMut(PendingCompletion) -> bool,
    {
        loop {
            let pending = self.next_pending();
            if !callback(pending) {
                break;
            }
        }
        self.wait_for_worker();
    }

    /// Fails every waiting and future operation, like a transport that shut down.
    pub fn keep_polling(&self) {
        self.completion_queue.shutdown();
        self.wait_for_worker();
    }

    fn next_pending(&self) -> PendingCompletion {
        self.wait_for_worker();
        self.completion_queue
            .try_next()
            .expect("expected a pending operation on the completion queue")
    }
}

impl Default for GrpcStreamTester {
    fn default() -> Self {
        Self::new()
    }
}
