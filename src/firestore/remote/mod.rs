pub mod connection;
pub mod connectivity_monitor;
pub mod datastore;
pub mod grpc_call;
pub mod grpc_completion;
pub mod grpc_status;
pub mod grpc_streaming_reader;
pub mod proto;
pub mod serializer;
pub mod stream;

pub use connection::{ConnectionBuilder, DatabaseInfo, GrpcConnection};
pub use connectivity_monitor::{ConnectivityMonitor, ManualConnectivityMonitor, NetworkStatus};
pub use datastore::Datastore;
pub use grpc_call::{GrpcCall, ResponseHeaders};
pub use grpc_completion::{CompletionKind, CompletionQueue, GrpcCompletion, PendingCompletion};
pub use grpc_status::{GrpcStatus, GrpcStatusCode};
pub use grpc_streaming_reader::{GrpcStreamingReader, ReaderState, StreamingReaderCallback};
pub use serializer::{
    decode_resource_name, encode_database_root, encode_resource_name, extract_local_path,
    Serializer,
};
pub use stream::{InProcessStream, StreamFrame, StreamTransport, TransportGrpcCall};
