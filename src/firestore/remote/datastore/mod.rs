use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;

use crate::firestore::error::FirestoreResult;
use crate::firestore::model::{DocumentKey, MaybeDocument};
use crate::firestore::remote::connection::GrpcConnection;
use crate::firestore::remote::grpc_call::GrpcCall;
use crate::firestore::remote::grpc_streaming_reader::GrpcStreamingReader;
use crate::firestore::remote::proto::{BatchGetDocumentsResponse, Message};
use crate::firestore::remote::serializer::Serializer;

const BATCH_GET_DOCUMENTS: &str = "BatchGetDocuments";

type ActiveReaders = Arc<Mutex<HashMap<u64, GrpcStreamingReader>>>;

/// Issues remote reads for one database.
pub struct Datastore {
    connection: Arc<GrpcConnection>,
    serializer: Serializer,
    active_readers: ActiveReaders,
    next_reader_id: AtomicU64,
}

impl Datastore {
    pub fn new(connection: Arc<GrpcConnection>) -> Self {
        let serializer = Serializer::new(connection.database_info().database_id().clone());
        Self {
            connection,
            serializer,
            active_readers: Arc::new(Mutex::new(HashMap::new())),
            next_reader_id: AtomicU64::new(1),
        }
    }

    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    /// Looks up `keys` with a single BatchGetDocuments call over `call`.
    ///
    /// `callback` runs once on the worker queue with one entry per response: found documents
    /// and tombstones for missing ones. The first response that fails to decode fails the whole
    /// lookup.
    pub fn lookup_documents<F>(&self, keys: &[DocumentKey], call: Box<dyn GrpcCall>, callback: F)
    where
        F: FnOnce(FirestoreResult<Vec<MaybeDocument>>) + Send + 'static,
    {
        let request = self.serializer.encode_batch_get_request(keys).encode_to_bytes();
        let reader = self.connection.create_streaming_reader(BATCH_GET_DOCUMENTS, call);
        let reader_id = self.next_reader_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("looking up {} documents (reader {reader_id})", keys.len());

        let serializer = self.serializer.clone();
        let active_readers = Arc::clone(&self.active_readers);
        let on_complete = move |result: FirestoreResult<Vec<Bytes>>| {
            let reader = active_readers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&reader_id);
            drop(reader);
            callback(result.and_then(|responses| decode_lookup_responses(&serializer, &responses)));
        };

        // Registered before starting so the completion always finds it.
        let mut readers = self.lock_readers();
        readers
            .entry(reader_id)
            .or_insert(reader)
            .start(request, on_complete);
    }

    /// Number of lookups still waiting for their call to finish.
    pub fn active_lookups(&self) -> usize {
        self.lock_readers().len()
    }

    /// Cancels every outstanding lookup without notifying its callback.
    pub fn shutdown(&self) {
        let readers: Vec<GrpcStreamingReader> = self
            .lock_readers()
            .drain()
            .map(|(_, reader)| reader)
            .collect();
        for reader in &readers {
            reader.finish_immediately();
        }
    }

    fn lock_readers(&self) -> std::sync::MutexGuard<'_, HashMap<u64, GrpcStreamingReader>> {
        self.active_readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Datastore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn decode_lookup_responses(
    serializer: &Serializer,
    responses: &[Bytes],
) -> FirestoreResult<Vec<MaybeDocument>> {
    responses
        .iter()
        .map(|bytes| {
            let response = BatchGetDocumentsResponse::decode(bytes)?;
            serializer.decode_maybe_document(&response)
        })
        .collect()
}
