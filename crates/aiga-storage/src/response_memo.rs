//! Response memo - answers memoized by transcript digest.
//!
//! Two sessions whose compacted transcripts render to the same digest share
//! one entry, so a repeated question skips the model call entirely. Entries
//! expire; an expired entry is removed on the read that finds it.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const RESPONSE_MEMO_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("response_memo");

/// One memoized answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMemoEntry {
    pub content: String,
    pub expires_at: DateTime<Utc>,
}

/// Digest-keyed answer store with expiry
#[derive(Debug, Clone)]
pub struct ResponseMemoStorage {
    db: Arc<Database>,
}

impl ResponseMemoStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(RESPONSE_MEMO_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store content under the digest with a ttl in seconds.
    pub fn put(&self, digest: &str, content: &str, ttl_secs: i64) -> Result<()> {
        let entry = ResponseMemoEntry {
            content: content.to_string(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        };
        let bytes = bincode::serde::encode_to_vec(&entry, bincode::config::standard())?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RESPONSE_MEMO_TABLE)?;
            table.insert(digest, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch a live entry's content. An expired entry is deleted and reported
    /// as absent.
    pub fn get(&self, digest: &str) -> Result<Option<String>> {
        let entry = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(RESPONSE_MEMO_TABLE)?;

            match table.get(digest)? {
                Some(value) => {
                    let (entry, _): (ResponseMemoEntry, usize) = bincode::serde::decode_from_slice(
                        value.value(),
                        bincode::config::standard(),
                    )?;
                    Some(entry)
                }
                None => None,
            }
        };

        match entry {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.content)),
            Some(_) => {
                debug!(digest = %digest, "Expired response memo entry removed");
                let write_txn = self.db.begin_write()?;
                {
                    let mut table = write_txn.open_table(RESPONSE_MEMO_TABLE)?;
                    table.remove(digest)?;
                }
                write_txn.commit()?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Check if a live entry exists without touching expired ones.
    pub fn exists(&self, digest: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RESPONSE_MEMO_TABLE)?;

        match table.get(digest)? {
            Some(value) => {
                let (entry, _): (ResponseMemoEntry, usize) =
                    bincode::serde::decode_from_slice(value.value(), bincode::config::standard())?;
                Ok(entry.expires_at > Utc::now())
            }
            None => Ok(false),
        }
    }
}
