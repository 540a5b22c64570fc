//! Frame-level streams and the adapter that runs a [`GrpcCall`] over one.
//!
//! A [`StreamTransport`] moves message and status frames for a single call. [`InProcessStream`]
//! is the in-process implementation: two connected ends, one for the client and one for a peer
//! playing the server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use bytes::Bytes;

use crate::firestore::error::{cancelled, FirestoreResult};
use crate::firestore::remote::grpc_call::{GrpcCall, ResponseHeaders};
use crate::firestore::remote::grpc_completion::{GrpcCompletion, PendingCompletion};
use crate::firestore::remote::grpc_status::{GrpcStatus, GrpcStatusCode};
use crate::platform::runtime;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamFrame {
    Message(Bytes),
    /// Last frame of the stream. An ok status is a normal close.
    Status(GrpcStatus),
}

/// Carries the frames of one call.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    async fn send(&self, frame: StreamFrame) -> FirestoreResult<()>;

    /// The next inbound frame, or `None` once the stream is closed and drained.
    async fn next(&self) -> Option<StreamFrame>;

    /// Stops the stream in both directions.
    fn close(&self);
}

/// One end of an in-process stream.
#[derive(Debug)]
pub struct InProcessStream {
    outbound: Sender<StreamFrame>,
    inbound: Receiver<StreamFrame>,
}

impl InProcessStream {
    /// Two connected ends: frames sent on one arrive at the other.
    pub fn pair() -> (Self, Self) {
        let (left_tx, left_rx) = async_channel::unbounded();
        let (right_tx, right_rx) = async_channel::unbounded();
        (
            Self {
                outbound: right_tx,
                inbound: left_rx,
            },
            Self {
                outbound: left_tx,
                inbound: right_rx,
            },
        )
    }
}

#[async_trait]
impl StreamTransport for InProcessStream {
    async fn send(&self, frame: StreamFrame) -> FirestoreResult<()> {
        self.outbound
            .send(frame)
            .await
            .map_err(|_| cancelled("in-process stream is closed"))
    }

    async fn next(&self) -> Option<StreamFrame> {
        self.inbound.recv().await.ok()
    }

    fn close(&self) {
        self.outbound.close();
        self.inbound.close();
    }
}

/// Runs a [`GrpcCall`] over a [`StreamTransport`]. Each operation completes from a background
/// task once the transport answers.
///
/// Finish reports the status frame the peer sent. Frames still queued ahead of it are
/// discarded, so a call whose write failed still sees why the peer ended it.
pub struct TransportGrpcCall<T: StreamTransport> {
    transport: Arc<T>,
    // Set by a read that reached the status frame.
    final_status: Arc<Mutex<Option<GrpcStatus>>>,
    cancelled: Arc<AtomicBool>,
}

impl<T: StreamTransport> TransportGrpcCall<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            final_status: Arc::new(Mutex::new(None)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<T: StreamTransport> GrpcCall for TransportGrpcCall<T> {
    fn start_write(&mut self, message: Bytes, completion: PendingCompletion) {
        let transport = Arc::clone(&self.transport);
        let cancelled = Arc::clone(&self.cancelled);
        runtime::spawn_detached(async move {
            let ok = !cancelled.load(Ordering::SeqCst)
                && transport.send(StreamFrame::Message(message)).await.is_ok();
            completion.complete(GrpcCompletion::Write(ok));
        });
    }

    fn start_read(&mut self, completion: PendingCompletion) {
        let transport = Arc::clone(&self.transport);
        let final_status = Arc::clone(&self.final_status);
        runtime::spawn_detached(async move {
            let message = match transport.next().await {
                Some(StreamFrame::Message(message)) => Some(message),
                Some(StreamFrame::Status(status)) => {
                    *final_status.lock().unwrap_or_else(PoisonError::into_inner) = Some(status);
                    None
                }
                None => None,
            };
            completion.complete(GrpcCompletion::Read(message));
        });
    }

    fn start_finish(&mut self, completion: PendingCompletion) {
        let transport = Arc::clone(&self.transport);
        let final_status = Arc::clone(&self.final_status);
        let cancelled = Arc::clone(&self.cancelled);
        runtime::spawn_detached(async move {
            let seen = final_status
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let status = match seen {
                Some(status) => status,
                None if cancelled.load(Ordering::SeqCst) => {
                    GrpcStatus::new(GrpcStatusCode::Cancelled, "call cancelled")
                }
                None => await_status(transport.as_ref()).await,
            };
            completion.complete(GrpcCompletion::Finish(status));
        });
    }

    fn try_cancel(&mut self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            log::debug!("cancelling stream call");
            self.transport.close();
        }
    }

    fn response_headers(&self) -> ResponseHeaders {
        ResponseHeaders::new()
    }
}

async fn await_status<T: StreamTransport>(transport: &T) -> GrpcStatus {
    while let Some(frame) = transport.next().await {
        match frame {
            StreamFrame::Status(status) => return status,
            StreamFrame::Message(_) => log::debug!("discarding message received after the last read"),
        }
    }
    GrpcStatus::new(
        GrpcStatusCode::Unavailable,
        "stream ended before a status was received",
    )
}
