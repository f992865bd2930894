//! AIGA Storage - durable persistence for the turn orchestration engine.
//!
//! This crate provides the persistence layer over redb, the embedded
//! database. It exposes byte-level and string-level APIs so the orchestration
//! crates keep ownership of their own serialized models and no model types
//! leak downward.
//!
//! # Tables
//!
//! - `session_checkpoints` - full per-session state persisted between turns
//! - `tool_result_cache` - externalized tool outputs, keyed per session
//! - `response_memo` - completed answers keyed by transcript digest, with expiry

pub mod checkpoint;
pub mod keyspace;
pub mod response_memo;
pub mod result_cache;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use checkpoint::SessionCheckpointStorage;
pub use keyspace::KeyspaceStorage;
pub use response_memo::{ResponseMemoEntry, ResponseMemoStorage};
pub use result_cache::{CachedToolResult, ToolResultCacheStorage};

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    db: Arc<Database>,
    pub checkpoints: SessionCheckpointStorage,
    pub result_cache: ToolResultCacheStorage,
    pub response_memo: ResponseMemoStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);

        let checkpoints = SessionCheckpointStorage::new(db.clone())?;
        let result_cache = ToolResultCacheStorage::new(db.clone())?;
        let response_memo = ResponseMemoStorage::new(db.clone())?;

        Ok(Self {
            db,
            checkpoints,
            result_cache,
            response_memo,
        })
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }
}
