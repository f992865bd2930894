//! Session checkpoint storage - byte-level API for durable per-session state.
//!
//! The orchestration layer serializes the full session (transcript, context
//! memory, counters) and stores it here after every completed turn. This
//! crate never interprets the bytes.

use crate::define_keyspace_storage;

define_keyspace_storage! {
    /// Durable per-session state, one entry per session id.
    pub struct SessionCheckpointStorage { table: "session_checkpoints" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_put_and_get_raw() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = SessionCheckpointStorage::new(db).unwrap();

        let data = b"serialized session state";
        storage.put_raw("session-001", data).unwrap();

        let retrieved = storage.get_raw("session-001").unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap(), data);
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = SessionCheckpointStorage::new(db).unwrap();

        storage.put_raw("session-001", b"turn one").unwrap();
        storage.put_raw("session-001", b"turn two").unwrap();

        let retrieved = storage.get_raw("session-001").unwrap();
        assert_eq!(retrieved.unwrap(), b"turn two");
    }

    #[test]
    fn test_exists_and_delete() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = SessionCheckpointStorage::new(db).unwrap();

        assert!(!storage.exists("session-001").unwrap());

        storage.put_raw("session-001", b"state").unwrap();
        assert!(storage.exists("session-001").unwrap());

        let deleted = storage.delete("session-001").unwrap();
        assert!(deleted);
        assert!(!storage.exists("session-001").unwrap());
    }
}
