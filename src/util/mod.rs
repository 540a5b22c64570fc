pub mod assert;
pub mod async_queue;

pub use assert::{assertion_error, hard_assert, hard_fail};
pub use async_queue::AsyncQueue;
