use super::{Document, DocumentStore, Query};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

type Collections = HashMap<String, BTreeMap<String, Value>>;

/// A process-local document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Collections) -> T) -> Result<T> {
        let collections = self
            .collections
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(f(&collections))
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.read(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.read(|c| {
            c.get(collection)
                .and_then(|docs| docs.get(id))
                .map(|data| Document {
                    id: id.to_string(),
                    data: data.clone(),
                })
        })
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        self.insert(collection, id, data)
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String> {
        let id = new_id();
        self.insert(collection, &id, data)?;
        Ok(id)
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>> {
        let docs = self.read(|c| {
            c.get(collection)
                .map(|docs| {
                    docs.iter()
                        .map(|(id, data)| Document {
                            id: id.clone(),
                            data: data.clone(),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;
        Ok(query.apply(docs))
    }
}
