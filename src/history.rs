use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One persisted turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Errors raised by a [`HistoryStore`].
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A persisted line could not be parsed as a record. `line` is 1-based.
    #[error("corrupt history record on line {line}")]
    Corrupt {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("history storage error")]
    Io(#[from] std::io::Error),
}

/// Durable, bounded, ordered storage of [`MessageRecord`]s.
///
/// The store holds one global sequence in insertion order. Appending past the
/// configured maximum discards the oldest records. Storage is the sole source
/// of truth; callers reload the sequence around every operation rather than
/// keeping a copy.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load the full persisted sequence, oldest first. An absent log is an
    /// empty sequence, not an error.
    async fn load(&self) -> Result<Vec<MessageRecord>, HistoryError>;

    /// Append one record, trimming from the front so the sequence never
    /// exceeds the configured maximum, and persist the result.
    async fn append(
        &self,
        role: Role,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), HistoryError>;
}

fn push_and_trim(records: &mut Vec<MessageRecord>, record: MessageRecord, max_len: usize) {
    records.push(record);
    if records.len() > max_len {
        let excess = records.len() - max_len;
        records.drain(..excess);
    }
}

/// [`HistoryStore`] backed by a JSON Lines file, one record per line.
///
/// Every `append` reads the whole file back, pushes the new record, trims and
/// rewrites the file in full. That is O(n) per call, which is fine only
/// because n is capped at `max_len`.
pub struct FileHistoryStore {
    path: PathBuf,
    max_len: usize,
}

impl FileHistoryStore {
    /// Create a store writing to `path`, keeping at most `max_len` records.
    pub fn new(path: impl Into<PathBuf>, max_len: usize) -> Self {
        Self {
            path: path.into(),
            max_len,
        }
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn load(&self) -> Result<Vec<MessageRecord>, HistoryError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let record = serde_json::from_str(line).map_err(|source| HistoryError::Corrupt {
                line: idx + 1,
                source,
            })?;
            records.push(record);
        }
        Ok(records)
    }

    async fn append(
        &self,
        role: Role,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        let mut records = self.load().await?;
        push_and_trim(
            &mut records,
            MessageRecord {
                role,
                content: content.to_string(),
                timestamp,
            },
            self.max_len,
        );
        let mut out = String::new();
        for record in &records {
            // Serializing a struct of plain fields cannot fail, but the error
            // is mapped rather than unwrapped to keep the write path total.
            let line = serde_json::to_string(record).map_err(|e| {
                HistoryError::Io(std::io::Error::new(ErrorKind::InvalidData, e))
            })?;
            out.push_str(&line);
            out.push('\n');
        }
        tokio::fs::write(&self.path, out).await?;
        tracing::debug!(len = records.len(), "history written");
        Ok(())
    }
}

/// In-memory [`HistoryStore`] with the same trim semantics as
/// [`FileHistoryStore`]. No persistence; used by tests and examples.
pub struct MemoryHistory {
    records: Mutex<Vec<MessageRecord>>,
    max_len: usize,
}

impl MemoryHistory {
    pub fn new(max_len: usize) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            max_len,
        }
    }

    /// Snapshot of the stored records.
    pub fn records(&self) -> Vec<MessageRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn load(&self) -> Result<Vec<MessageRecord>, HistoryError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn append(
        &self,
        role: Role,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        let mut records = self.records.lock().unwrap();
        push_and_trim(
            &mut records,
            MessageRecord {
                role,
                content: content.to_string(),
                timestamp,
            },
            self.max_len,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir, max_len: usize) -> FileHistoryStore {
        FileHistoryStore::new(dir.path().join("history.jsonl"), max_len)
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 10);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn round_trip_preserves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 10);
        let when = Utc::now();
        store.append(Role::User, "hello there", when).await.unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].role, Role::User);
        assert_eq!(records[0].content, "hello there");
        assert_eq!(records[0].timestamp, when);
    }

    #[tokio::test]
    async fn append_trims_oldest_past_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 3);
        for content in ["A", "B", "C", "D"] {
            store.append(Role::User, content, Utc::now()).await.unwrap();
        }

        let contents: Vec<_> = store
            .load()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, ["B", "C", "D"]);
    }

    #[tokio::test]
    async fn order_is_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 100);
        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            store
                .append(role, &format!("m{i}"), Utc::now())
                .await
                .unwrap();
        }

        let contents: Vec<_> = store
            .load()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, ["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn corrupt_line_fails_with_its_position() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, 10);
        store.append(Role::User, "fine", Utc::now()).await.unwrap();
        let path = dir.path().join("history.jsonl");
        let mut text = tokio::fs::read_to_string(&path).await.unwrap();
        text.push_str("not a record\n");
        tokio::fs::write(&path, text).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, HistoryError::Corrupt { line: 2, .. }));
    }

    #[tokio::test]
    async fn memory_store_mirrors_trim_semantics() {
        let store = MemoryHistory::new(2);
        for content in ["A", "B", "C"] {
            store.append(Role::User, content, Utc::now()).await.unwrap();
        }
        let contents: Vec<_> = store.records().into_iter().map(|r| r.content).collect();
        assert_eq!(contents, ["B", "C"]);
    }
}
