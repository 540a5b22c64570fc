use crate::firestore::model::{FieldPath, ResourcePath};
use crate::firestore::value::FieldValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    LessThan,
    LessThanOrEqual,
    Equal,
    GreaterThanOrEqual,
    GreaterThan,
    ArrayContains,
}

/// A single `field <op> value` constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    field: FieldPath,
    op: FilterOperator,
    value: FieldValue,
}

impl Filter {
    pub fn new(field: FieldPath, op: FilterOperator, value: FieldValue) -> Self {
        Self { field, op, value }
    }

    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn op(&self) -> FilterOperator {
        self.op
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }
}

/// A query over the documents below `path`.
///
/// Only the path is carried over the wire today. Filters can be attached, but the serializer
/// rejects them rather than dropping them silently.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    path: ResourcePath,
    filters: Vec<Filter>,
}

impl Query {
    pub fn new(path: ResourcePath, filters: Vec<Filter>) -> Self {
        Self { path, filters }
    }

    pub fn at_path(path: ResourcePath) -> Self {
        Self::new(path, Vec::new())
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn with_filter(&self, filter: Filter) -> Self {
        let mut filters = self.filters.clone();
        filters.push(filter);
        Self::new(self.path.clone(), filters)
    }
}
