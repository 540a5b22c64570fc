mod constants;
pub mod error;
pub mod model;
pub mod remote;
pub mod value;

pub use error::{FirestoreError, FirestoreErrorCode, FirestoreResult};
