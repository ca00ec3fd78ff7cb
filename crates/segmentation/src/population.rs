//! Client population sources. Records arrive already decrypted; failures
//! are handed back to the caller untouched.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use audience_core::types::ClientRecord;
use audience_core::{AudienceError, AudienceResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

/// Loads the full client population for one segmentation call.
#[async_trait]
pub trait ClientSource: Send + Sync {
    async fn load_clients(&self) -> AudienceResult<Vec<ClientRecord>>;
}

struct StoredRecord {
    seq: u64,
    record: ClientRecord,
}

/// Concurrent in-process store keyed by client id. Loads return records in
/// first-insertion order so repeated calls see the same population order.
pub struct InMemoryClientSource {
    store: DashMap<String, StoredRecord>,
    next_seq: AtomicU64,
}

impl InMemoryClientSource {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = ClientRecord>) -> Self {
        let source = Self::new();
        for record in records {
            source.upsert(record);
        }
        source
    }

    /// Insert or replace a record. Replacing keeps the original position.
    pub fn upsert(&self, record: ClientRecord) {
        match self.store.entry(record.id.clone()) {
            Entry::Occupied(mut existing) => existing.get_mut().record = record,
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(StoredRecord { seq, record });
            }
        }
    }

    pub fn remove(&self, client_id: &str) -> Option<ClientRecord> {
        self.store.remove(client_id).map(|(_, stored)| stored.record)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for InMemoryClientSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientSource for InMemoryClientSource {
    async fn load_clients(&self) -> AudienceResult<Vec<ClientRecord>> {
        let mut entries: Vec<(u64, ClientRecord)> = self
            .store
            .iter()
            .map(|e| (e.value().seq, e.value().record.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        Ok(entries.into_iter().map(|(_, record)| record).collect())
    }
}

/// Reads a JSON array of client records from disk on every load.
pub struct JsonFileClientSource {
    path: PathBuf,
}

impl JsonFileClientSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ClientSource for JsonFileClientSource {
    async fn load_clients(&self) -> AudienceResult<Vec<ClientRecord>> {
        debug!(path = %self.path.display(), "Reading client snapshot");
        let raw = tokio::fs::read(&self.path).await.map_err(|e| {
            AudienceError::Population(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let records: Vec<ClientRecord> = serde_json::from_slice(&raw)?;
        info!(path = %self.path.display(), clients = records.len(), "Client snapshot loaded");
        Ok(records)
    }
}
