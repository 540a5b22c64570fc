//! Test utilities shared across crate-level unit tests.

pub mod grpc_stream_tester;

pub use grpc_stream_tester::{FakeGrpcCall, GrpcStreamTester};
