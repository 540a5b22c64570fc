use std::collections::BTreeMap;

use bytes::Bytes;

use crate::firestore::remote::grpc_completion::PendingCompletion;

/// Response metadata received from the server. Keys are lower-case.
pub type ResponseHeaders = BTreeMap<String, String>;

/// One bidirectional call on the transport.
///
/// Every `start_*` operation completes exactly once through its [`PendingCompletion`], on
/// whatever thread the transport chooses. Callers keep at most one operation of each kind
/// outstanding.
pub trait GrpcCall: Send + 'static {
    fn start_write(&mut self, message: Bytes, completion: PendingCompletion);

    fn start_read(&mut self, completion: PendingCompletion);

    /// Asks for the final status. Completes after the server closed the call or it was
    /// cancelled.
    fn start_finish(&mut self, completion: PendingCompletion);

    /// Cancels the call. Outstanding operations still complete, typically with failures.
    fn try_cancel(&mut self);

    fn response_headers(&self) -> ResponseHeaders;
}
