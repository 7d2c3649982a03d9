//! Append-only JSONL document store.
//!
//! Every write is appended as one `{"collection", "id", "data"}` line. Opening
//! the store replays the log into memory, so the last write for an id wins.

use super::memory::{MemoryStore, new_id};
use super::{Document, DocumentStore, Query};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

#[derive(Debug, Serialize, Deserialize)]
struct WriteRecord {
    collection: String,
    id: String,
    data: Value,
}

/// Appends whole lines. After a failed write the tail may hold a partial
/// line, so the next line starts with a newline to keep it readable.
struct LogWriter<W> {
    out: W,
    torn: bool,
}

impl<W: AsyncWrite + Unpin> LogWriter<W> {
    fn new(out: W, torn: bool) -> Self {
        Self { out, torn }
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 2);
        if self.torn {
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');

        self.torn = true;
        self.out.write_all(&bytes).await?;
        self.out.flush().await?;
        self.torn = false;
        Ok(())
    }
}

pub struct JsonlStore {
    path: PathBuf,
    log: Mutex<LogWriter<tokio::fs::File>>,
    cache: MemoryStore,
}

impl JsonlStore {
    /// Opens or creates the log at `path` and replays it.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create store directory: {}", parent.display()))?;
        }

        let cache = MemoryStore::new();
        let mut replayed = 0usize;
        let mut needs_newline = false;
        if tokio::fs::try_exists(path).await? {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read store: {}", path.display()))?;
            needs_newline = !content.is_empty() && !content.ends_with('\n');
            for (number, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<WriteRecord>(line) {
                    Ok(record) => {
                        cache.insert(&record.collection, &record.id, record.data)?;
                        replayed += 1;
                    }
                    // A torn final line from a crash should not make the store unreadable.
                    Err(e) => tracing::warn!(
                        "skipping unreadable store line {} in {}: {}",
                        number + 1,
                        path.display(),
                        e
                    ),
                }
            }
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open store for writing: {}", path.display()))?;

        tracing::info!("Opened store {} ({} writes replayed)", path.display(), replayed);
        Ok(Self {
            path: path.to_path_buf(),
            log: Mutex::new(LogWriter::new(file, needs_newline)),
            cache,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let record = WriteRecord {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        };
        let line = serde_json::to_string(&record)?;

        // The log line is written before the cache so a failed write leaves no trace.
        self.log
            .lock()
            .await
            .write_line(&line)
            .await
            .with_context(|| format!("Failed to append to store: {}", self.path.display()))?;
        self.cache.insert(collection, id, record.data)
    }
}

#[async_trait]
impl DocumentStore for JsonlStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.cache.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        self.append(collection, id, data).await
    }

    async fn add(&self, collection: &str, data: Value) -> Result<String> {
        let id = new_id();
        self.append(collection, &id, data).await?;
        Ok(id)
    }

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>> {
        self.cache.query(collection, query).await
    }
}
