use std::sync::Arc;

use crate::firestore::constants::{DEFAULT_HOST, EMULATOR_HOST_ENV};
use crate::firestore::error::FirestoreResult;
use crate::firestore::model::DatabaseId;
use crate::firestore::remote::connectivity_monitor::{
    ConnectivityMonitor, ManualConnectivityMonitor,
};
use crate::firestore::remote::grpc_call::GrpcCall;
use crate::firestore::remote::grpc_streaming_reader::GrpcStreamingReader;
use crate::util::async_queue::AsyncQueue;

/// Where and how to reach the backend for one database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseInfo {
    database_id: DatabaseId,
    persistence_key: String,
    host: String,
    ssl_enabled: bool,
}

impl DatabaseInfo {
    pub fn new(
        database_id: DatabaseId,
        persistence_key: impl Into<String>,
        host: impl Into<String>,
        ssl_enabled: bool,
    ) -> Self {
        Self {
            database_id,
            persistence_key: persistence_key.into(),
            host: host.into(),
            ssl_enabled,
        }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn persistence_key(&self) -> &str {
        &self.persistence_key
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn ssl_enabled(&self) -> bool {
        self.ssl_enabled
    }
}

pub struct ConnectionBuilder {
    database_id: DatabaseId,
    persistence_key: String,
    host: String,
    ssl_enabled: bool,
    emulator_host: Option<String>,
    worker_queue: Option<AsyncQueue>,
    connectivity_monitor: Option<Arc<dyn ConnectivityMonitor>>,
}

impl ConnectionBuilder {
    /// Starts from the production host, unless `FIRESTORE_EMULATOR_HOST` is set.
    pub fn new(database_id: DatabaseId) -> Self {
        Self {
            database_id,
            persistence_key: "[DEFAULT]".to_string(),
            host: DEFAULT_HOST.to_string(),
            ssl_enabled: true,
            emulator_host: std::env::var(EMULATOR_HOST_ENV)
                .ok()
                .filter(|host| !host.is_empty()),
            worker_queue: None,
            connectivity_monitor: None,
        }
    }

    pub fn with_persistence_key(mut self, persistence_key: impl Into<String>) -> Self {
        self.persistence_key = persistence_key.into();
        self
    }

    /// Targets `host` directly, ignoring any emulator configuration.
    pub fn with_host(mut self, host: impl Into<String>, ssl_enabled: bool) -> Self {
        self.host = host.into();
        self.ssl_enabled = ssl_enabled;
        self.emulator_host = None;
        self
    }

    pub fn with_emulator_host(mut self, host: impl Into<String>) -> Self {
        self.emulator_host = Some(host.into());
        self
    }

    pub fn with_worker_queue(mut self, worker_queue: AsyncQueue) -> Self {
        self.worker_queue = Some(worker_queue);
        self
    }

    pub fn with_connectivity_monitor(mut self, monitor: Arc<dyn ConnectivityMonitor>) -> Self {
        self.connectivity_monitor = Some(monitor);
        self
    }

    pub fn database_info(&self) -> DatabaseInfo {
        match &self.emulator_host {
            // The emulator only speaks plain text.
            Some(host) => DatabaseInfo::new(
                self.database_id.clone(),
                self.persistence_key.clone(),
                host.clone(),
                false,
            ),
            None => DatabaseInfo::new(
                self.database_id.clone(),
                self.persistence_key.clone(),
                self.host.clone(),
                self.ssl_enabled,
            ),
        }
    }

    pub fn build(self) -> FirestoreResult<GrpcConnection> {
        let database_info = self.database_info();
        if let Some(host) = &self.emulator_host {
            log::debug!("using Firestore emulator at {host}");
        }
        let worker_queue = match self.worker_queue {
            Some(queue) => queue,
            None => AsyncQueue::new("firestore-worker")?,
        };
        let connectivity_monitor = self
            .connectivity_monitor
            .unwrap_or_else(|| Arc::new(ManualConnectivityMonitor::new()) as Arc<dyn ConnectivityMonitor>);
        Ok(GrpcConnection {
            database_info,
            worker_queue,
            connectivity_monitor,
        })
    }
}

/// Shared state for every call made to one database: its target, connectivity and the worker
/// queue that readers run on.
pub struct GrpcConnection {
    database_info: DatabaseInfo,
    worker_queue: AsyncQueue,
    connectivity_monitor: Arc<dyn ConnectivityMonitor>,
}

impl GrpcConnection {
    pub fn builder(database_id: DatabaseId) -> ConnectionBuilder {
        ConnectionBuilder::new(database_id)
    }

    pub fn database_info(&self) -> &DatabaseInfo {
        &self.database_info
    }

    pub fn worker_queue(&self) -> &AsyncQueue {
        &self.worker_queue
    }

    pub fn connectivity_monitor(&self) -> &Arc<dyn ConnectivityMonitor> {
        &self.connectivity_monitor
    }

    /// Wraps `call` in a reader that runs on this connection's worker queue.
    pub fn create_streaming_reader(
        &self,
        rpc_name: &str,
        call: Box<dyn GrpcCall>,
    ) -> GrpcStreamingReader {
        GrpcStreamingReader::new(rpc_name, call, self.worker_queue.clone())
    }
}

impl std::fmt::Debug for GrpcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcConnection")
            .field("database_info", &self.database_info)
            .field("worker_queue", &self.worker_queue)
            .finish()
    }
}
