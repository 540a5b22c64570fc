use std::fmt;

use async_channel::{Receiver, Sender, TrySendError};
use bytes::Bytes;

use crate::firestore::remote::grpc_status::{GrpcStatus, GrpcStatusCode};
use crate::util::assert::hard_assert;

/// The operation a completion belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompletionKind {
    Write,
    Read,
    Finish,
}

/// The outcome of one transport operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrpcCompletion {
    /// `true` when the request message was handed to the transport.
    Write(bool),
    /// The next response message, or `None` once the stream has no more messages.
    Read(Option<Bytes>),
    Finish(GrpcStatus),
}

impl GrpcCompletion {
    pub fn kind(&self) -> CompletionKind {
        match self {
            GrpcCompletion::Write(_) => CompletionKind::Write,
            GrpcCompletion::Read(_) => CompletionKind::Read,
            GrpcCompletion::Finish(_) => CompletionKind::Finish,
        }
    }

    /// The outcome a transport reports for an operation it could not perform.
    pub fn failed(kind: CompletionKind) -> Self {
        match kind {
            CompletionKind::Write => GrpcCompletion::Write(false),
            CompletionKind::Read => GrpcCompletion::Read(None),
            CompletionKind::Finish => GrpcCompletion::Finish(GrpcStatus::new(
                GrpcStatusCode::Cancelled,
                "Completion queue shut down",
            )),
        }
    }
}

type CompletionHandler = Box<dyn FnOnce(GrpcCompletion) + Send + 'static>;

/// A started operation waiting for its outcome.
///
/// Completing it hands the outcome to whoever issued the operation; the handler is responsible
/// for moving back onto its own queue.
pub struct PendingCompletion {
    kind: CompletionKind,
    handler: CompletionHandler,
}

impl PendingCompletion {
    pub fn new<F>(kind: CompletionKind, handler: F) -> Self
    where
        F: FnOnce(GrpcCompletion) + Send + 'static,
    {
        Self {
            kind,
            handler: Box::new(handler),
        }
    }

    pub fn kind(&self) -> CompletionKind {
        self.kind
    }

    #[track_caller]
    pub fn complete(self, completion: GrpcCompletion) {
        hard_assert(
            completion.kind() == self.kind,
            format!(
                "completion of type {:?} delivered to a pending {:?} operation",
                completion.kind(),
                self.kind
            ),
        );
        (self.handler)(completion);
    }

    pub fn fail(self) {
        let completion = GrpcCompletion::failed(self.kind);
        self.complete(completion);
    }
}

impl fmt::Debug for PendingCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCompletion")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Collects operations a transport has started so a poller can drain and complete them.
///
/// Once shut down, every pending and newly pushed operation is failed immediately.
#[derive(Clone)]
pub struct CompletionQueue {
    sender: Sender<PendingCompletion>,
    receiver: Receiver<PendingCompletion>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn push(&self, pending: PendingCompletion) {
        match self.sender.try_send(pending) {
            Ok(()) => {}
            Err(TrySendError::Closed(pending)) | Err(TrySendError::Full(pending)) => {
                log::debug!("failing {:?} on shut down completion queue", pending.kind());
                pending.fail();
            }
        }
    }

    /// Waits for the next started operation. Returns `None` once shut down and drained.
    pub async fn next(&self) -> Option<PendingCompletion> {
        self.receiver.recv().await.ok()
    }

    pub fn try_next(&self) -> Option<PendingCompletion> {
        self.receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn shutdown(&self) {
        self.sender.close();
        while let Some(pending) = self.try_next() {
            pending.fail();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.sender.is_closed()
    }
}

impl Default for CompletionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CompletionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionQueue")
            .field("pending", &self.len())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
