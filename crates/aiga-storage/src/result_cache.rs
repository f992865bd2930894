//! Tool result cache - persistence for externalized tool outputs.
//!
//! When the history compactor moves a large tool result out of a transcript
//! it lands here under a fresh result id, scoped to the owning session. The
//! stored content is the original JSON text, untouched.
//!
//! Keys are `session_id:result_id`, so lookups always require both and one
//! session can never read another session's results.

use anyhow::Result;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const TOOL_RESULT_CACHE_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("tool_result_cache");

/// One externalized tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToolResult {
    /// Original tool output as JSON text.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Low-level tool result cache with session-scoped keys
#[derive(Debug, Clone)]
pub struct ToolResultCacheStorage {
    db: Arc<Database>,
}

impl ToolResultCacheStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn scoped_key(session_id: &str, result_id: &str) -> String {
        format!("{}:{}", session_id, result_id)
    }

    /// Store one externalized tool output. Re-inserting the same
    /// (session, result) pair replaces the previous content.
    pub fn put(&self, session_id: &str, result_id: &str, content: &str) -> Result<()> {
        let entry = CachedToolResult {
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let bytes = bincode::serde::encode_to_vec(&entry, bincode::config::standard())?;

        let key = Self::scoped_key(session_id, result_id);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a cached result by (session, result) pair.
    pub fn get(&self, session_id: &str, result_id: &str) -> Result<Option<CachedToolResult>> {
        let key = Self::scoped_key(session_id, result_id);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;

        if let Some(value) = table.get(key.as_str())? {
            let (entry, _): (CachedToolResult, usize) =
                bincode::serde::decode_from_slice(value.value(), bincode::config::standard())?;
            Ok(Some(entry))
        } else {
            Ok(None)
        }
    }

    /// List all cached results for a session as (result_id, entry) pairs.
    pub fn list_by_session(&self, session_id: &str) -> Result<Vec<(String, CachedToolResult)>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;

        let prefix = format!("{}:", session_id);
        let mut results = Vec::new();

        for item in table.iter()? {
            let (key, value) = item?;
            let key_str = key.value();

            if let Some(result_id) = key_str.strip_prefix(&prefix) {
                let (entry, _): (CachedToolResult, usize) =
                    bincode::serde::decode_from_slice(value.value(), bincode::config::standard())?;
                results.push((result_id.to_string(), entry));
            }
        }

        Ok(results)
    }

    /// Delete all cached results for a session, returning the removed count.
    pub fn delete_session(&self, session_id: &str) -> Result<u32> {
        let keys: Vec<String> = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;
            let prefix = format!("{}:", session_id);

            let mut keys = Vec::new();
            for item in table.iter()? {
                let (key, _) = item?;
                if key.value().starts_with(&prefix) {
                    keys.push(key.value().to_string());
                }
            }
            keys
        };

        let count = keys.len() as u32;
        if count == 0 {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;
            for key in &keys {
                table.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;

        Ok(count)
    }

    /// Count all cached results across sessions.
    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TOOL_RESULT_CACHE_TABLE)?;
        Ok(table.len()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_storage() -> ToolResultCacheStorage {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        ToolResultCacheStorage::new(db).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let storage = create_test_storage();

        let content = r#"{"chat_type":"recommand_doctor","answer":{"doctors":[]}}"#;
        storage.put("session-001", "result-001", content).unwrap();

        let retrieved = storage.get("session-001", "result-001").unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().content, content);
    }

    #[test]
    fn test_get_requires_matching_session() {
        let storage = create_test_storage();

        storage.put("session-001", "result-001", "{}").unwrap();

        // Same result id under a different session must not resolve.
        let other = storage.get("session-002", "result-001").unwrap();
        assert!(other.is_none());
    }

    #[test]
    fn test_list_by_session() {
        let storage = create_test_storage();

        storage.put("session-001", "result-001", "{\"a\":1}").unwrap();
        storage.put("session-001", "result-002", "{\"b\":2}").unwrap();
        storage.put("session-002", "result-003", "{\"c\":3}").unwrap();

        let results = storage.list_by_session("session-001").unwrap();
        assert_eq!(results.len(), 2);

        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"result-001"));
        assert!(ids.contains(&"result-002"));
    }

    #[test]
    fn test_delete_session_leaves_others() {
        let storage = create_test_storage();

        storage.put("session-001", "result-001", "{}").unwrap();
        storage.put("session-001", "result-002", "{}").unwrap();
        storage.put("session-002", "result-003", "{}").unwrap();

        let deleted = storage.delete_session("session-001").unwrap();
        assert_eq!(deleted, 2);

        assert!(storage.get("session-001", "result-001").unwrap().is_none());
        assert!(storage.get("session-002", "result-003").unwrap().is_some());
        assert_eq!(storage.count().unwrap(), 1);
    }

    #[test]
    fn test_put_replaces_existing() {
        let storage = create_test_storage();

        storage.put("session-001", "result-001", "{\"v\":1}").unwrap();
        storage.put("session-001", "result-001", "{\"v\":2}").unwrap();

        let retrieved = storage.get("session-001", "result-001").unwrap().unwrap();
        assert_eq!(retrieved.content, "{\"v\":2}");
        assert_eq!(storage.count().unwrap(), 1);
    }
}
