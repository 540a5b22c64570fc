use crate::firestore::model::{DocumentKey, SnapshotVersion};
use crate::firestore::value::ObjectValue;

/// Whether a document reflects backend state or carries unacknowledged local writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentState {
    Synced,
    LocalMutations,
    CommittedMutations,
}

/// A document that exists on the backend at `version`.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    key: DocumentKey,
    version: SnapshotVersion,
    data: ObjectValue,
    state: DocumentState,
}

impl Document {
    pub fn new(
        data: ObjectValue,
        key: DocumentKey,
        version: SnapshotVersion,
        state: DocumentState,
    ) -> Self {
        Self {
            key,
            version,
            data,
            state,
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn data(&self) -> &ObjectValue {
        &self.data
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn has_local_mutations(&self) -> bool {
        self.state == DocumentState::LocalMutations
    }

    pub fn has_committed_mutations(&self) -> bool {
        self.state == DocumentState::CommittedMutations
    }
}

/// A tombstone recording that no document existed at `version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoDocument {
    key: DocumentKey,
    version: SnapshotVersion,
    has_committed_mutations: bool,
}

impl NoDocument {
    pub fn new(key: DocumentKey, version: SnapshotVersion, has_committed_mutations: bool) -> Self {
        Self {
            key,
            version,
            has_committed_mutations,
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn has_committed_mutations(&self) -> bool {
        self.has_committed_mutations
    }
}

/// Either a present [`Document`] or a [`NoDocument`] tombstone.
#[derive(Clone, Debug, PartialEq)]
pub enum MaybeDocument {
    Document(Document),
    NoDocument(NoDocument),
}

impl MaybeDocument {
    pub fn key(&self) -> &DocumentKey {
        match self {
            MaybeDocument::Document(document) => document.key(),
            MaybeDocument::NoDocument(no_document) => no_document.key(),
        }
    }

    pub fn version(&self) -> SnapshotVersion {
        match self {
            MaybeDocument::Document(document) => document.version(),
            MaybeDocument::NoDocument(no_document) => no_document.version(),
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            MaybeDocument::Document(document) => Some(document),
            MaybeDocument::NoDocument(_) => None,
        }
    }

    pub fn as_no_document(&self) -> Option<&NoDocument> {
        match self {
            MaybeDocument::Document(_) => None,
            MaybeDocument::NoDocument(no_document) => Some(no_document),
        }
    }
}

impl From<Document> for MaybeDocument {
    fn from(value: Document) -> Self {
        MaybeDocument::Document(value)
    }
}

impl From<NoDocument> for MaybeDocument {
    fn from(value: NoDocument) -> Self {
        MaybeDocument::NoDocument(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::model::Timestamp;
    use crate::firestore::value::FieldValue;

    #[test]
    fn maybe_document_exposes_key_and_version() {
        let key = DocumentKey::from_string("rooms/eros").unwrap();
        let version = SnapshotVersion::new(Timestamp::new(10, 0));
        let data = ObjectValue::from_entries([("a", FieldValue::from_integer(1))]);

        let found: MaybeDocument =
            Document::new(data.clone(), key.clone(), version, DocumentState::Synced).into();
        assert_eq!(found.key(), &key);
        assert_eq!(found.version(), version);
        assert_eq!(found.as_document().map(Document::data), Some(&data));
        assert!(found.as_no_document().is_none());

        let missing: MaybeDocument = NoDocument::new(key.clone(), version, false).into();
        assert!(missing.as_document().is_none());
        assert!(!missing.as_no_document().unwrap().has_committed_mutations());
    }
}
