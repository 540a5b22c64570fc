use std::collections::BTreeMap;

use crate::firestore::error::{data_loss, unimplemented, FirestoreResult};
use crate::firestore::model::{
    DatabaseId, Document, DocumentKey, DocumentState, MaybeDocument, NoDocument, Query,
    ResourcePath, SnapshotVersion, Timestamp,
};
use crate::firestore::remote::proto::{self, BatchGetResult, QueryType, ValueType};
use crate::firestore::value::{FieldValue, ObjectValue, ValueKind};

/// Converts between the client model and `google.firestore.v1` wire messages for one database.
///
/// Every resource name produced or accepted is scoped to the [`DatabaseId`] the serializer was
/// built with; names belonging to another project or database fail to decode.
#[derive(Clone, Debug)]
pub struct Serializer {
    database_id: DatabaseId,
    database_name: String,
}

impl Serializer {
    pub fn new(database_id: DatabaseId) -> Self {
        let database_name = encode_database_root(&database_id).canonical_string();
        Self {
            database_id,
            database_name,
        }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    /// `projects/{project}/databases/{database}`.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn encode_key(&self, key: &DocumentKey) -> String {
        encode_resource_name(&self.database_id, key.path())
    }

    /// Decodes a fully qualified document name, checking that it belongs to this database.
    pub fn decode_key(&self, name: &str) -> FirestoreResult<DocumentKey> {
        let resource = decode_resource_name(name)?;
        if resource.len() < 5 {
            return Err(data_loss(format!(
                "Attempted to decode invalid key: '{name}'. Should have at least 5 segments."
            )));
        }

        let project_id = resource.get(1).unwrap_or_default();
        if project_id != self.database_id.project_id() {
            return Err(data_loss(format!(
                "Tried to deserialize key from different project. Expected: '{}'. Found: '{}'. (Full key: '{}')",
                self.database_id.project_id(),
                project_id,
                name
            )));
        }

        let database = resource.get(3).unwrap_or_default();
        if database != self.database_id.database() {
            return Err(data_loss(format!(
                "Tried to deserialize key from different database. Expected: '{}'. Found: '{}'. (Full key: '{}')",
                self.database_id.database(),
                database,
                name
            )));
        }

        let local_path = extract_local_path(&resource)?;
        if !DocumentKey::is_document_key(&local_path) {
            return Err(data_loss(format!(
                "Invalid document key path: {}",
                local_path.canonical_string()
            )));
        }
        DocumentKey::from_path(local_path).map_err(|err| data_loss(err.message()))
    }

    /// Encodes the parent of a query. The backend requires the root collection to be addressed by
    /// the bare database name, without the trailing `/documents`.
    pub fn encode_query_path(&self, path: &ResourcePath) -> String {
        if path.is_empty() {
            return self.database_name.clone();
        }
        encode_resource_name(&self.database_id, path)
    }

    pub fn decode_query_path(&self, name: &str) -> FirestoreResult<ResourcePath> {
        let resource = decode_resource_name(name)?;
        if resource.len() == 4 {
            // No trailing "documents" segment: the root path.
            return Ok(ResourcePath::root());
        }
        extract_local_path(&resource)
    }

    /// Encodes a value. Types the wire codec does not support yet produce an `Unimplemented`
    /// error rather than a lossy encoding.
    pub fn encode_field_value(value: &FieldValue) -> FirestoreResult<proto::Value> {
        let value_type = match value.kind() {
            ValueKind::Null => ValueType::NullValue(proto::NULL_VALUE),
            ValueKind::Boolean(boolean) => ValueType::BooleanValue(u8::from(*boolean)),
            ValueKind::Integer(integer) => ValueType::IntegerValue(*integer),
            ValueKind::String(string) => ValueType::StringValue(string.clone()),
            ValueKind::Timestamp(timestamp) => {
                ValueType::TimestampValue(Self::encode_timestamp(timestamp))
            }
            ValueKind::Object(object) => ValueType::MapValue(Self::encode_map_value(object)?),
            other @ (ValueKind::Double(_)
            | ValueKind::Bytes(_)
            | ValueKind::Reference(_)
            | ValueKind::GeoPoint(_)
            | ValueKind::Array(_)) => {
                return Err(unimplemented(format!(
                    "Encoding {} values is not supported yet",
                    other.type_name()
                )));
            }
        };
        Ok(proto::Value::new(value_type))
    }

    pub fn decode_field_value(value: &proto::Value) -> FirestoreResult<FieldValue> {
        match &value.value_type {
            Some(ValueType::NullValue(null_value)) => {
                if *null_value != proto::NULL_VALUE {
                    return Err(data_loss(
                        "Input proto bytes cannot be parsed (invalid null value)",
                    ));
                }
                Ok(FieldValue::null())
            }
            // Compare the raw byte; a corrupt peer may send values other than 0 and 1.
            Some(ValueType::BooleanValue(raw)) => Ok(FieldValue::from_bool(*raw != 0)),
            Some(ValueType::IntegerValue(integer)) => Ok(FieldValue::from_integer(*integer)),
            Some(ValueType::StringValue(string)) => Ok(FieldValue::from_string(string.as_str())),
            Some(ValueType::TimestampValue(timestamp)) => {
                Ok(FieldValue::from_timestamp(Self::decode_timestamp(timestamp)?))
            }
            Some(ValueType::MapValue(map)) => {
                Ok(FieldValue::from_object(Self::decode_fields(&map.fields)?))
            }
            Some(
                other @ (ValueType::DoubleValue(_)
                | ValueType::BytesValue(_)
                | ValueType::ReferenceValue(_)
                | ValueType::GeoPointValue(_)
                | ValueType::ArrayValue(_)),
            ) => Err(unimplemented(format!(
                "Decoding {} values is not supported yet",
                wire_type_name(other)
            ))),
            None => Err(data_loss(
                "Invalid type while decoding FieldValue: no value type set",
            )),
        }
    }

    fn encode_map_value(object: &ObjectValue) -> FirestoreResult<proto::MapValue> {
        Ok(proto::MapValue {
            fields: Self::encode_fields(object)?,
        })
    }

    fn encode_fields(object: &ObjectValue) -> FirestoreResult<Vec<proto::FieldsEntry>> {
        object
            .fields()
            .iter()
            .map(|(key, value)| {
                Ok(proto::FieldsEntry::new(
                    key.as_str(),
                    Self::encode_field_value(value)?,
                ))
            })
            .collect()
    }

    fn decode_fields(entries: &[proto::FieldsEntry]) -> FirestoreResult<ObjectValue> {
        let mut fields = BTreeMap::new();
        for entry in entries {
            if entry.key.is_empty() {
                return Err(data_loss(
                    "Invalid message: Empty key while decoding a Map field value.",
                ));
            }
            let value = Self::decode_field_value(&entry.value)?;
            fields.insert(entry.key.clone(), value);
        }
        Ok(ObjectValue::new(fields))
    }

    pub fn encode_timestamp(timestamp: &Timestamp) -> proto::Timestamp {
        proto::Timestamp {
            seconds: timestamp.seconds(),
            nanos: timestamp.nanos(),
        }
    }

    /// Range-checks a wire timestamp before building the model value, so a corrupt byte yields
    /// an error instead of a failed assertion.
    pub fn decode_timestamp(timestamp: &proto::Timestamp) -> FirestoreResult<Timestamp> {
        Timestamp::validate(timestamp.seconds, timestamp.nanos)
            .map_err(|reason| data_loss(format!("Invalid message: {reason}")))?;
        Ok(Timestamp::new(timestamp.seconds, timestamp.nanos))
    }

    pub fn encode_version(version: &SnapshotVersion) -> proto::Timestamp {
        Self::encode_timestamp(&version.timestamp())
    }

    /// An absent timestamp decodes to [`SnapshotVersion::none`].
    pub fn decode_snapshot_version(
        timestamp: Option<&proto::Timestamp>,
    ) -> FirestoreResult<SnapshotVersion> {
        match timestamp {
            Some(timestamp) => Ok(SnapshotVersion::new(Self::decode_timestamp(timestamp)?)),
            None => Ok(SnapshotVersion::none()),
        }
    }

    /// Encodes a document for writing. Create and update times are output only and never sent.
    pub fn encode_document(
        &self,
        key: &DocumentKey,
        value: &ObjectValue,
    ) -> FirestoreResult<proto::Document> {
        Ok(proto::Document {
            name: self.encode_key(key),
            fields: Self::encode_fields(value)?,
            create_time: None,
            update_time: None,
        })
    }

    pub fn decode_document(&self, document: &proto::Document) -> FirestoreResult<Document> {
        let key = self.decode_key(&document.name)?;
        let fields = Self::decode_fields(&document.fields)?;
        let version = Self::decode_snapshot_version(document.update_time.as_ref())?;
        Ok(Document::new(fields, key, version, DocumentState::Synced))
    }

    pub fn decode_maybe_document(
        &self,
        response: &proto::BatchGetDocumentsResponse,
    ) -> FirestoreResult<MaybeDocument> {
        match &response.result {
            Some(BatchGetResult::Found(document)) => {
                self.decode_found_document(document).map(MaybeDocument::from)
            }
            Some(BatchGetResult::Missing(name)) => self
                .decode_missing_document(name, response.read_time.as_ref())
                .map(MaybeDocument::from),
            None => Err(data_loss("Unknown result case: no result set")),
        }
    }

    fn decode_found_document(&self, document: &proto::Document) -> FirestoreResult<Document> {
        let decoded = self.decode_document(document)?;
        if decoded.version().is_none() {
            return Err(data_loss("Got a document response with no snapshot version"));
        }
        Ok(decoded)
    }

    fn decode_missing_document(
        &self,
        name: &str,
        read_time: Option<&proto::Timestamp>,
    ) -> FirestoreResult<NoDocument> {
        let key = self.decode_key(name)?;
        let version = Self::decode_snapshot_version(read_time)?;
        if version.is_none() {
            return Err(data_loss("Got a no document response with no snapshot version"));
        }
        Ok(NoDocument::new(key, version, false))
    }

    /// Builds the request used to look up `keys` in a single streaming call.
    pub fn encode_batch_get_request(&self, keys: &[DocumentKey]) -> proto::BatchGetDocumentsRequest {
        proto::BatchGetDocumentsRequest {
            database: self.database_name.clone(),
            documents: keys.iter().map(|key| self.encode_key(key)).collect(),
        }
    }

    /// Encodes a collection query. Only the target path is supported: document queries and
    /// filters are rejected with `Unimplemented`.
    pub fn encode_query_target(&self, query: &Query) -> FirestoreResult<proto::QueryTarget> {
        if !query.filters().is_empty() {
            return Err(unimplemented("Encoding query filters is not supported yet"));
        }

        let path = query.path();
        let mut structured_query = proto::StructuredQuery::default();
        let parent = match path.last_segment() {
            None => self.encode_query_path(&ResourcePath::root()),
            Some(_) if path.len() % 2 == 0 => {
                return Err(unimplemented(format!(
                    "Document queries are not supported by query targets: {path}"
                )));
            }
            Some(collection_id) => {
                structured_query.from.push(proto::CollectionSelector {
                    collection_id: collection_id.to_string(),
                    all_descendants: false,
                });
                self.encode_query_path(&path.without_last())
            }
        };

        Ok(proto::QueryTarget {
            parent,
            query_type: Some(QueryType::StructuredQuery(structured_query)),
        })
    }

    pub fn decode_query_target(&self, target: &proto::QueryTarget) -> FirestoreResult<Query> {
        let structured_query = match &target.query_type {
            Some(QueryType::StructuredQuery(query)) => query,
            None => return Err(data_loss("Unknown query_type: no query type set")),
        };

        let mut path = self.decode_query_path(&target.parent)?;
        if !structured_query.unsupported_clauses.is_empty() {
            return Err(unimplemented(format!(
                "StructuredQuery fields {:?} are not supported yet",
                structured_query.unsupported_clauses
            )));
        }

        match structured_query.from.as_slice() {
            [] => {}
            [selector] => {
                if selector.all_descendants {
                    return Err(unimplemented("Collection group queries are not supported yet"));
                }
                path = path.append(selector.collection_id.as_str());
            }
            _ => {
                return Err(unimplemented(
                    "StructuredQuery.from with more than one collection is not supported.",
                ));
            }
        }

        Ok(Query::at_path(path))
    }
}

/// `projects/{project}/databases/{database}` as a path.
pub fn encode_database_root(database_id: &DatabaseId) -> ResourcePath {
    ResourcePath::from_segments([
        "projects",
        database_id.project_id(),
        "databases",
        database_id.database(),
    ])
}

/// `projects/{project}/databases/{database}/documents/{path}`.
pub fn encode_resource_name(database_id: &DatabaseId, path: &ResourcePath) -> String {
    encode_database_root(database_id)
        .append("documents")
        .append_path(path)
        .canonical_string()
}

/// Parses a resource name and checks that it carries a project and database. A local path is not
/// required.
pub fn decode_resource_name(encoded: &str) -> FirestoreResult<ResourcePath> {
    let invalid = || data_loss(format!("Tried to deserialize an invalid key {encoded}"));
    let resource = ResourcePath::from_string(encoded).map_err(|_| invalid())?;
    if !is_valid_resource_name(&resource) {
        return Err(invalid());
    }
    Ok(resource)
}

/// Strips `projects/{p}/databases/{d}/documents` from a decoded resource name.
pub fn extract_local_path(resource_name: &ResourcePath) -> FirestoreResult<ResourcePath> {
    if resource_name.len() <= 4 || resource_name.get(4) != Some("documents") {
        return Err(data_loss(format!(
            "Tried to deserialize invalid key {}",
            resource_name.canonical_string()
        )));
    }
    Ok(resource_name.pop_first_n(5))
}

fn is_valid_resource_name(path: &ResourcePath) -> bool {
    path.len() >= 4 && path.get(0) == Some("projects") && path.get(2) == Some("databases")
}

fn wire_type_name(value_type: &ValueType) -> &'static str {
    match value_type {
        ValueType::NullValue(_) => "null",
        ValueType::BooleanValue(_) => "boolean",
        ValueType::IntegerValue(_) => "integer",
        ValueType::DoubleValue(_) => "double",
        ValueType::TimestampValue(_) => "timestamp",
        ValueType::StringValue(_) => "string",
        ValueType::BytesValue(_) => "bytes",
        ValueType::ReferenceValue(_) => "reference",
        ValueType::GeoPointValue(_) => "geo point",
        ValueType::ArrayValue(_) => "array",
        ValueType::MapValue(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::error::FirestoreErrorCode;
    use crate::firestore::model::{FieldPath, Filter, FilterOperator};
    use crate::firestore::remote::proto::Message;

    fn serializer() -> Serializer {
        Serializer::new(DatabaseId::new("p", "d"))
    }

    fn key(path: &str) -> DocumentKey {
        DocumentKey::from_string(path).unwrap()
    }

    #[test]
    fn encodes_database_root_and_names() {
        let db = DatabaseId::new("p", "d");
        assert_eq!(encode_database_root(&db).canonical_string(), "projects/p/databases/d");
        assert_eq!(
            encode_resource_name(&db, &ResourcePath::from_segments(["rooms", "eros"])),
            "projects/p/databases/d/documents/rooms/eros"
        );
        assert_eq!(serializer().database_name(), "projects/p/databases/d");
    }

    #[test]
    fn decode_resource_name_validates_prefix() {
        assert!(decode_resource_name("projects/p/databases/d").is_ok());
        for bad in ["projects/p", "project/p/databases/d", "projects/p/database/d", ""] {
            let err = decode_resource_name(bad).unwrap_err();
            assert_eq!(err.code, FirestoreErrorCode::DataLoss);
            assert!(err.message().contains(bad), "{err}");
        }
    }

    #[test]
    fn extract_local_path_requires_documents_segment() {
        let full = ResourcePath::from_string("projects/p/databases/d/documents/a/b").unwrap();
        assert_eq!(
            extract_local_path(&full).unwrap(),
            ResourcePath::from_segments(["a", "b"])
        );
        let wrong = ResourcePath::from_string("projects/p/databases/d/other/a/b").unwrap();
        assert!(extract_local_path(&wrong).is_err());
        let short = ResourcePath::from_string("projects/p/databases/d").unwrap();
        assert!(extract_local_path(&short).is_err());
    }

    #[test]
    fn key_round_trip() {
        let serializer = serializer();
        let key = key("rooms/eros/messages/1");
        let encoded = serializer.encode_key(&key);
        assert_eq!(encoded, "projects/p/databases/d/documents/rooms/eros/messages/1");
        assert_eq!(serializer.decode_key(&encoded).unwrap(), key);
    }

    #[test]
    fn decode_key_rejects_other_project_and_database() {
        let serializer = serializer();
        let err = serializer
            .decode_key("projects/other/databases/d/documents/a/b")
            .unwrap_err();
        assert!(err.message().contains("different project"));
        assert!(err.message().contains("Expected: 'p'. Found: 'other'"));

        let err = serializer
            .decode_key("projects/p/databases/other/documents/a/b")
            .unwrap_err();
        assert!(err.message().contains("different database"));
    }

    #[test]
    fn decode_key_rejects_non_document_paths() {
        let serializer = serializer();
        assert!(serializer.decode_key("projects/p/databases/d").is_err());
        assert!(serializer.decode_key("projects/p/databases/d/documents").is_err());
        let err = serializer
            .decode_key("projects/p/databases/d/documents/rooms")
            .unwrap_err();
        assert_eq!(err.message(), "Invalid document key path: rooms");
    }

    #[test]
    fn query_path_special_cases_root() {
        let serializer = serializer();
        assert_eq!(
            serializer.encode_query_path(&ResourcePath::root()),
            "projects/p/databases/d"
        );
        assert!(serializer
            .decode_query_path("projects/p/databases/d")
            .unwrap()
            .is_empty());
        assert_eq!(
            serializer
                .decode_query_path("projects/p/databases/d/documents/rooms/eros")
                .unwrap(),
            ResourcePath::from_segments(["rooms", "eros"])
        );
    }

    #[test]
    fn boolean_decoding_normalizes_raw_bytes() {
        let decode = |raw| {
            Serializer::decode_field_value(&proto::Value::new(ValueType::BooleanValue(raw)))
                .unwrap()
        };
        assert_eq!(decode(0), FieldValue::from_bool(false));
        assert_eq!(decode(1), FieldValue::from_bool(true));
        assert_eq!(decode(2), FieldValue::from_bool(true));
        assert_eq!(decode(0xff), FieldValue::from_bool(true));
    }

    #[test]
    fn invalid_null_value_fails() {
        let err = Serializer::decode_field_value(&proto::Value::new(ValueType::NullValue(1)))
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::DataLoss);
    }

    #[test]
    fn missing_value_type_fails() {
        let err = Serializer::decode_field_value(&proto::Value::default()).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::DataLoss);
    }

    #[test]
    fn unsupported_types_are_unimplemented_both_ways() {
        let err = Serializer::encode_field_value(&FieldValue::from_double(1.0)).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unimplemented);
        let err = Serializer::encode_field_value(&FieldValue::from_array(vec![])).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unimplemented);

        // nested inside a map as well
        let nested = FieldValue::from_object(ObjectValue::from_entries([(
            "d",
            FieldValue::from_reference("projects/p/databases/d/documents/a/b"),
        )]));
        let err = Serializer::encode_field_value(&nested).unwrap_err();
        assert!(err.message().contains("reference"));

        let err = Serializer::decode_field_value(&proto::Value::new(ValueType::DoubleValue(1.0)))
            .unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unimplemented);
    }

    #[test]
    fn empty_map_key_fails() {
        let value = proto::Value::new(ValueType::MapValue(proto::MapValue {
            fields: vec![proto::FieldsEntry::new(
                "",
                proto::Value::new(ValueType::IntegerValue(1)),
            )],
        }));
        let err = Serializer::decode_field_value(&value).unwrap_err();
        assert!(err.message().contains("Empty key"));
    }

    #[test]
    fn first_failure_short_circuits_nested_decode() {
        let value = proto::Value::new(ValueType::MapValue(proto::MapValue {
            fields: vec![
                proto::FieldsEntry::new(
                    "a",
                    proto::Value::new(ValueType::TimestampValue(proto::Timestamp {
                        seconds: 0,
                        nanos: -1,
                    })),
                ),
                proto::FieldsEntry::new("", proto::Value::default()),
            ],
        }));
        let err = Serializer::decode_field_value(&value).unwrap_err();
        assert!(err.message().contains("nanos"), "{err}");
    }

    #[test]
    fn timestamp_range_is_checked() {
        let decode = |seconds, nanos| {
            Serializer::decode_timestamp(&proto::Timestamp { seconds, nanos })
        };
        assert!(decode(Timestamp::MIN_SECONDS - 1, 0).is_err());
        assert!(decode(Timestamp::MAX_SECONDS + 1, 0).is_err());
        assert!(decode(0, -1).is_err());
        assert!(decode(0, 1_000_000_000).is_err());
        assert_eq!(
            decode(Timestamp::MAX_SECONDS, 999_999_999).unwrap(),
            Timestamp::max()
        );
        assert_eq!(decode(Timestamp::MIN_SECONDS, 0).unwrap(), Timestamp::min());
    }

    #[test]
    fn encode_document_skips_output_only_fields() {
        let serializer = serializer();
        let data = ObjectValue::from_entries([("a", FieldValue::from_integer(1))]);
        let encoded = serializer.encode_document(&key("rooms/eros"), &data).unwrap();
        assert_eq!(encoded.name, "projects/p/databases/d/documents/rooms/eros");
        assert_eq!(encoded.fields.len(), 1);
        assert!(encoded.create_time.is_none());
        assert!(encoded.update_time.is_none());
    }

    #[test]
    fn decodes_found_and_missing_documents() {
        let serializer = serializer();
        let data = ObjectValue::from_entries([("a", FieldValue::from_string("b"))]);
        let mut document = serializer.encode_document(&key("rooms/eros"), &data).unwrap();
        document.update_time = Some(proto::Timestamp {
            seconds: 5,
            nanos: 6,
        });

        let found = proto::BatchGetDocumentsResponse {
            result: Some(BatchGetResult::Found(document)),
            ..Default::default()
        };
        let decoded = serializer.decode_maybe_document(&found).unwrap();
        let decoded = decoded.as_document().unwrap();
        assert_eq!(decoded.data(), &data);
        assert_eq!(decoded.state(), DocumentState::Synced);
        assert_eq!(decoded.version(), SnapshotVersion::new(Timestamp::new(5, 6)));

        let missing = proto::BatchGetDocumentsResponse {
            result: Some(BatchGetResult::Missing(
                "projects/p/databases/d/documents/rooms/gone".to_string(),
            )),
            read_time: Some(proto::Timestamp {
                seconds: 7,
                nanos: 0,
            }),
            ..Default::default()
        };
        let decoded = serializer.decode_maybe_document(&missing).unwrap();
        let tombstone = decoded.as_no_document().unwrap();
        assert_eq!(tombstone.key(), &key("rooms/gone"));
        assert!(!tombstone.has_committed_mutations());
    }

    #[test]
    fn documents_without_versions_fail() {
        let serializer = serializer();
        let found = proto::BatchGetDocumentsResponse {
            result: Some(BatchGetResult::Found(proto::Document {
                name: "projects/p/databases/d/documents/rooms/eros".to_string(),
                ..Default::default()
            })),
            ..Default::default()
        };
        let err = serializer.decode_maybe_document(&found).unwrap_err();
        assert!(err.message().contains("no snapshot version"));

        let missing = proto::BatchGetDocumentsResponse {
            result: Some(BatchGetResult::Missing(
                "projects/p/databases/d/documents/rooms/eros".to_string(),
            )),
            ..Default::default()
        };
        assert!(serializer.decode_maybe_document(&missing).is_err());

        let empty = proto::BatchGetDocumentsResponse::default();
        let err = serializer.decode_maybe_document(&empty).unwrap_err();
        assert!(err.message().starts_with("Unknown result case"));
    }

    #[test]
    fn batch_get_request_lists_keys() {
        let serializer = serializer();
        let request = serializer.encode_batch_get_request(&[key("a/b"), key("c/d")]);
        assert_eq!(request.database, "projects/p/databases/d");
        assert_eq!(
            request.documents,
            vec![
                "projects/p/databases/d/documents/a/b".to_string(),
                "projects/p/databases/d/documents/c/d".to_string(),
            ]
        );
    }

    #[test]
    fn encodes_collection_and_root_queries() {
        let serializer = serializer();
        let query = Query::at_path(ResourcePath::from_segments(["rooms", "eros", "messages"]));
        let target = serializer.encode_query_target(&query).unwrap();
        assert_eq!(target.parent, "projects/p/databases/d/documents/rooms/eros");
        let Some(QueryType::StructuredQuery(structured)) = &target.query_type else {
            panic!("expected a structured query");
        };
        assert_eq!(structured.from.len(), 1);
        assert_eq!(structured.from[0].collection_id, "messages");
        assert_eq!(serializer.decode_query_target(&target).unwrap(), query);

        let root = Query::at_path(ResourcePath::root());
        let target = serializer.encode_query_target(&root).unwrap();
        assert_eq!(target.parent, "projects/p/databases/d");
        assert_eq!(serializer.decode_query_target(&target).unwrap(), root);
    }

    #[test]
    fn rejects_filters_and_document_queries() {
        let serializer = serializer();
        let filtered = Query::at_path(ResourcePath::from_segments(["rooms"])).with_filter(
            Filter::new(
                FieldPath::from_dot_separated("size").unwrap(),
                FilterOperator::Equal,
                FieldValue::from_integer(1),
            ),
        );
        let err = serializer.encode_query_target(&filtered).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unimplemented);

        let document = Query::at_path(ResourcePath::from_segments(["rooms", "eros"]));
        let err = serializer.encode_query_target(&document).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unimplemented);
    }

    #[test]
    fn decode_query_target_rejects_unsupported_shapes() {
        let serializer = serializer();
        let selector = |id: &str| proto::CollectionSelector {
            collection_id: id.to_string(),
            all_descendants: false,
        };

        let two_collections = proto::QueryTarget {
            parent: "projects/p/databases/d".to_string(),
            query_type: Some(QueryType::StructuredQuery(proto::StructuredQuery {
                from: vec![selector("a"), selector("b")],
                unsupported_clauses: vec![],
            })),
        };
        let err = serializer.decode_query_target(&two_collections).unwrap_err();
        assert!(err.message().contains("more than one collection"));

        let no_type = proto::QueryTarget {
            parent: "projects/p/databases/d".to_string(),
            query_type: None,
        };
        assert!(serializer.decode_query_target(&no_type).is_err());

        let with_limit = proto::QueryTarget {
            parent: "projects/p/databases/d".to_string(),
            query_type: Some(QueryType::StructuredQuery(proto::StructuredQuery {
                from: vec![selector("a")],
                unsupported_clauses: vec![5],
            })),
        };
        let err = serializer.decode_query_target(&with_limit).unwrap_err();
        assert_eq!(err.code, FirestoreErrorCode::Unimplemented);
    }

    #[test]
    fn values_survive_the_wire() {
        let value = FieldValue::from_object(ObjectValue::from_entries([
            ("null", FieldValue::null()),
            ("flag", FieldValue::from_bool(false)),
            ("n", FieldValue::from_integer(i64::MIN)),
            ("s", FieldValue::from_string("")),
            ("t", FieldValue::from_timestamp(Timestamp::new(-1, 5))),
        ]));
        let encoded = Serializer::encode_field_value(&value).unwrap();
        let bytes = encoded.encode_to_bytes();
        let decoded = proto::Value::decode(&bytes).unwrap();
        assert_eq!(Serializer::decode_field_value(&decoded).unwrap(), value);
    }
}
