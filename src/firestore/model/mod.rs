mod database_id;
mod document;
mod document_key;
mod field_path;
mod geo_point;
mod query;
mod resource_path;
mod snapshot_version;
mod timestamp;

pub use database_id::DatabaseId;
pub use document::{Document, DocumentState, MaybeDocument, NoDocument};
pub use document_key::DocumentKey;
pub use field_path::FieldPath;
pub use geo_point::GeoPoint;
pub use query::{Filter, FilterOperator, Query};
pub use resource_path::ResourcePath;
pub use snapshot_version::SnapshotVersion;
pub use timestamp::Timestamp;
