mod array_value;
mod bytes_value;
mod object_value;
mod value;

pub use array_value::ArrayValue;
pub use bytes_value::BytesValue;
pub use object_value::ObjectValue;
pub use value::{FieldValue, ValueKind};
