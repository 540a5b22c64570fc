//! Owned mirrors of the `google.firestore.v1` messages exchanged by the remote layer.
//!
//! Variable-length fields are owned (`String`, `Bytes`, `Vec`) and released with the enclosing
//! message. Field numbers follow the published protos byte for byte.

mod wire;

use bytes::Bytes;

use crate::firestore::error::FirestoreResult;

pub use wire::{Message, ProtoReader, ProtoWriter, WireType, MAX_NESTING_DEPTH};

/// `google.protobuf.NullValue.NULL_VALUE`.
pub const NULL_VALUE: i32 = 0;

/// `google.protobuf.Timestamp`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Message for Timestamp {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_int64_if_set(1, self.seconds);
        writer.write_int32_if_set(2, self.nanos);
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.seconds = reader.read_int64(wire_type)?,
            2 => self.nanos = reader.read_int32(wire_type)?,
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// `google.type.LatLng`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl Message for LatLng {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_double_if_set(1, self.latitude);
        writer.write_double_if_set(2, self.longitude);
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.latitude = reader.read_double(wire_type)?,
            2 => self.longitude = reader.read_double(wire_type)?,
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// The `value_type` oneof of `google.firestore.v1.Value`.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueType {
    /// Raw enum number; only [`NULL_VALUE`] is valid.
    NullValue(i32),
    /// Raw byte as received. Anything other than 0 or 1 is possible from a corrupt peer.
    BooleanValue(u8),
    IntegerValue(i64),
    DoubleValue(f64),
    TimestampValue(Timestamp),
    StringValue(String),
    BytesValue(Bytes),
    ReferenceValue(String),
    GeoPointValue(LatLng),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// `google.firestore.v1.Value`. A missing `value_type` is representable so decoders can reject it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Value {
    pub value_type: Option<ValueType>,
}

impl Value {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type: Some(value_type),
        }
    }
}

impl Message for Value {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        // Oneof members are written even when they hold their default value.
        match &self.value_type {
            None => {}
            Some(ValueType::BooleanValue(value)) => writer.write_varint(1, u64::from(*value)),
            Some(ValueType::IntegerValue(value)) => writer.write_int64(2, *value),
            Some(ValueType::DoubleValue(value)) => writer.write_double(3, *value),
            Some(ValueType::ReferenceValue(value)) => writer.write_string(5, value),
            Some(ValueType::MapValue(value)) => writer.write_message(6, value),
            Some(ValueType::GeoPointValue(value)) => writer.write_message(8, value),
            Some(ValueType::ArrayValue(value)) => writer.write_message(9, value),
            Some(ValueType::TimestampValue(value)) => writer.write_message(10, value),
            Some(ValueType::NullValue(value)) => writer.write_int32(11, *value),
            Some(ValueType::StringValue(value)) => writer.write_string(17, value),
            Some(ValueType::BytesValue(value)) => writer.write_bytes(18, value),
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        let value_type = match field {
            1 => {
                let raw = reader.read_varint(wire_type)?;
                ValueType::BooleanValue(u8::try_from(raw).unwrap_or(u8::MAX))
            }
            2 => ValueType::IntegerValue(reader.read_int64(wire_type)?),
            3 => ValueType::DoubleValue(reader.read_double(wire_type)?),
            5 => ValueType::ReferenceValue(reader.read_string(wire_type)?),
            6 => ValueType::MapValue(reader.read_message(wire_type)?),
            8 => ValueType::GeoPointValue(reader.read_message(wire_type)?),
            9 => ValueType::ArrayValue(reader.read_message(wire_type)?),
            10 => ValueType::TimestampValue(reader.read_message(wire_type)?),
            11 => ValueType::NullValue(reader.read_int32(wire_type)?),
            17 => ValueType::StringValue(reader.read_string(wire_type)?),
            18 => ValueType::BytesValue(Bytes::copy_from_slice(reader.read_bytes(wire_type)?)),
            _ => return reader.skip(wire_type),
        };
        self.value_type = Some(value_type);
        Ok(())
    }
}

/// `google.firestore.v1.ArrayValue`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArrayValue {
    pub values: Vec<Value>,
}

impl Message for ArrayValue {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        for value in &self.values {
            writer.write_message(1, value);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.values.push(reader.read_message(wire_type)?),
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// One `map<string, Value>` entry. Kept as a list on the wire so decoders see every key as sent,
/// including empty ones.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldsEntry {
    pub key: String,
    pub value: Value,
}

impl FieldsEntry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl Message for FieldsEntry {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_string_if_set(1, &self.key);
        writer.write_message(2, &self.value);
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.key = reader.read_string(wire_type)?,
            2 => self.value = reader.read_message(wire_type)?,
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// `google.firestore.v1.MapValue`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    pub fields: Vec<FieldsEntry>,
}

impl Message for MapValue {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        for entry in &self.fields {
            writer.write_message(1, entry);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.fields.push(reader.read_message(wire_type)?),
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// `google.firestore.v1.Document`. `create_time` and `update_time` are output only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub name: String,
    pub fields: Vec<FieldsEntry>,
    pub create_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
}

impl Message for Document {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_string_if_set(1, &self.name);
        for entry in &self.fields {
            writer.write_message(2, entry);
        }
        if let Some(create_time) = &self.create_time {
            writer.write_message(3, create_time);
        }
        if let Some(update_time) = &self.update_time {
            writer.write_message(4, update_time);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.name = reader.read_string(wire_type)?,
            2 => self.fields.push(reader.read_message(wire_type)?),
            3 => self.create_time = Some(reader.read_message(wire_type)?),
            4 => self.update_time = Some(reader.read_message(wire_type)?),
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// `google.firestore.v1.BatchGetDocumentsRequest`, restricted to the fields used for lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchGetDocumentsRequest {
    pub database: String,
    pub documents: Vec<String>,
}

impl Message for BatchGetDocumentsRequest {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_string_if_set(1, &self.database);
        for document in &self.documents {
            writer.write_string(2, document);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.database = reader.read_string(wire_type)?,
            2 => self.documents.push(reader.read_string(wire_type)?),
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// The `result` oneof of `BatchGetDocumentsResponse`.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchGetResult {
    Found(Document),
    /// Resource name of a document that does not exist.
    Missing(String),
}

/// `google.firestore.v1.BatchGetDocumentsResponse`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchGetDocumentsResponse {
    pub result: Option<BatchGetResult>,
    pub transaction: Bytes,
    pub read_time: Option<Timestamp>,
}

impl Message for BatchGetDocumentsResponse {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        match &self.result {
            Some(BatchGetResult::Found(document)) => writer.write_message(1, document),
            Some(BatchGetResult::Missing(name)) => writer.write_string(2, name),
            None => {}
        }
        writer.write_bytes_if_set(3, &self.transaction);
        if let Some(read_time) = &self.read_time {
            writer.write_message(4, read_time);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.result = Some(BatchGetResult::Found(reader.read_message(wire_type)?)),
            2 => self.result = Some(BatchGetResult::Missing(reader.read_string(wire_type)?)),
            3 => self.transaction = Bytes::copy_from_slice(reader.read_bytes(wire_type)?),
            4 => self.read_time = Some(reader.read_message(wire_type)?),
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// `google.firestore.v1.StructuredQuery.CollectionSelector`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectionSelector {
    pub collection_id: String,
    pub all_descendants: bool,
}

impl Message for CollectionSelector {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_string_if_set(2, &self.collection_id);
        writer.write_bool_if_set(3, self.all_descendants);
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            2 => self.collection_id = reader.read_string(wire_type)?,
            3 => self.all_descendants = reader.read_varint(wire_type)? != 0,
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// `google.firestore.v1.StructuredQuery`.
///
/// Only `from` is modelled. The numbers of any other clause seen while decoding (select, where,
/// order_by, limit, offset, start_at, end_at) are recorded in `unsupported_clauses` so callers
/// can refuse the query instead of running a broader one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    pub unsupported_clauses: Vec<u32>,
}

impl Message for StructuredQuery {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        for selector in &self.from {
            writer.write_message(2, selector);
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            2 => self.from.push(reader.read_message(wire_type)?),
            1 | 3..=8 => {
                self.unsupported_clauses.push(field);
                reader.skip(wire_type)?;
            }
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

/// The `query_type` oneof of `Target.QueryTarget`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryType {
    StructuredQuery(StructuredQuery),
}

/// `google.firestore.v1.Target.QueryTarget`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryTarget {
    pub parent: String,
    pub query_type: Option<QueryType>,
}

impl Message for QueryTarget {
    fn encode_fields(&self, writer: &mut ProtoWriter) {
        writer.write_string_if_set(1, &self.parent);
        match &self.query_type {
            Some(QueryType::StructuredQuery(query)) => writer.write_message(2, query),
            None => {}
        }
    }

    fn merge_field(
        &mut self,
        field: u32,
        wire_type: WireType,
        reader: &mut ProtoReader<'_>,
    ) -> FirestoreResult<()> {
        match field {
            1 => self.parent = reader.read_string(wire_type)?,
            2 => {
                self.query_type = Some(QueryType::StructuredQuery(reader.read_message(wire_type)?))
            }
            _ => reader.skip(wire_type)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_keeps_raw_byte() {
        // field 1, varint 2
        let value = Value::decode(&[0x08, 0x02]).unwrap();
        assert_eq!(value.value_type, Some(ValueType::BooleanValue(2)));

        // a varint wider than a byte stays non-zero
        let value = Value::decode(&[0x08, 0x80, 0x02]).unwrap();
        assert_eq!(value.value_type, Some(ValueType::BooleanValue(u8::MAX)));
    }

    #[test]
    fn oneof_defaults_are_written() {
        let value = Value::new(ValueType::BooleanValue(0));
        assert_eq!(value.encode_to_bytes().as_ref(), &[0x08, 0x00]);
        let value = Value::new(ValueType::NullValue(NULL_VALUE));
        assert_eq!(value.encode_to_bytes().as_ref(), &[0x58, 0x00]);
        let value = Value::new(ValueType::StringValue(String::new()));
        assert_eq!(value.encode_to_bytes().as_ref(), &[0x8a, 0x01, 0x00]);
    }

    #[test]
    fn unknown_value_field_leaves_type_unset() {
        // field 40, varint 1
        let value = Value::decode(&[0xc0, 0x02, 0x01]).unwrap();
        assert_eq!(value.value_type, None);
    }

    #[test]
    fn document_round_trips() {
        let document = Document {
            name: "projects/p/databases/d/documents/rooms/eros".to_string(),
            fields: vec![
                FieldsEntry::new("a", Value::new(ValueType::IntegerValue(-5))),
                FieldsEntry::new(
                    "m",
                    Value::new(ValueType::MapValue(MapValue {
                        fields: vec![FieldsEntry::new(
                            "t",
                            Value::new(ValueType::TimestampValue(Timestamp {
                                seconds: 1,
                                nanos: 2,
                            })),
                        )],
                    })),
                ),
            ],
            create_time: None,
            update_time: Some(Timestamp {
                seconds: 10,
                nanos: 0,
            }),
        };
        let decoded = Document::decode(&document.encode_to_bytes()).unwrap();
        assert_eq!(decoded, document);
    }

    #[test]
    fn structured_query_records_unmodelled_clauses() {
        let mut writer = ProtoWriter::new();
        writer.write_message(
            2,
            &CollectionSelector {
                collection_id: "rooms".to_string(),
                all_descendants: false,
            },
        );
        // limit: Int32Value { value: 10 }
        writer.write_bytes(5, &[0x08, 0x0a]);
        let query = StructuredQuery::decode(&writer.into_bytes()).unwrap();
        assert_eq!(query.from.len(), 1);
        assert_eq!(query.unsupported_clauses, vec![5]);
    }

    #[test]
    fn batch_get_response_oneof() {
        let response = BatchGetDocumentsResponse {
            result: Some(BatchGetResult::Missing(
                "projects/p/databases/d/documents/a/b".to_string(),
            )),
            transaction: Bytes::new(),
            read_time: Some(Timestamp {
                seconds: 3,
                nanos: 4,
            }),
        };
        let decoded = BatchGetDocumentsResponse::decode(&response.encode_to_bytes()).unwrap();
        assert_eq!(decoded, response);
    }
}
