//! In-process transport: every endpoint reaches the same shared store.
//!
//! Models a healthy replicated cluster without any I/O. Revisions follow
//! etcd's scheme: one store-wide revision bumped per write, per-key
//! `create_revision`, `mod_revision` and `version`.

use crate::transport::KvTransport;
use etcdkit_common::{Endpoint, KeyValueRecord, TransportError};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemState {
    revision: i64,
    records: HashMap<Vec<u8>, KeyValueRecord>,
}

#[derive(Debug, Default)]
pub struct MemTransport {
    state: RwLock<MemState>,
}

impl MemTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current store revision (number of writes applied).
    pub async fn revision(&self) -> i64 {
        self.state.read().await.revision
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl KvTransport for MemTransport {
    async fn put(
        &self,
        _endpoint: &Endpoint,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), TransportError> {
        let mut state = self.state.write().await;
        state.revision += 1;
        let revision = state.revision;

        let record = state
            .records
            .entry(key.to_vec())
            .or_insert_with(|| KeyValueRecord {
                key: key.to_vec(),
                create_revision: revision,
                ..Default::default()
            });
        record.value = value.to_vec();
        record.mod_revision = revision;
        record.version += 1;
        Ok(())
    }

    async fn get(
        &self,
        _endpoint: &Endpoint,
        key: &[u8],
    ) -> Result<Option<KeyValueRecord>, TransportError> {
        Ok(self.state.read().await.records.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_revisions_track_writes() {
        let mem = MemTransport::new();
        let ep = Endpoint::http("localhost", 2379).unwrap();
        assert!(mem.is_empty().await);

        mem.put(&ep, b"a", b"1").await.unwrap();
        mem.put(&ep, b"b", b"1").await.unwrap();
        mem.put(&ep, b"a", b"2").await.unwrap();

        let a = mem.get(&ep, b"a").await.unwrap().unwrap();
        assert_eq!(a.value, b"2");
        assert_eq!(a.create_revision, 1);
        assert_eq!(a.mod_revision, 3);
        assert_eq!(a.version, 2);
        assert_eq!(mem.revision().await, 3);
        assert_eq!(mem.len().await, 2);
        assert_eq!(mem.get(&ep, b"c").await.unwrap(), None);
    }
}
