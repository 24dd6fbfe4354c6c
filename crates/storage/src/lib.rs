#![forbid(unsafe_code)]

//! Local progress cache for page-reload recovery. Persists the partial exam
//! state subset needed to rebuild a session offline; the server remains the
//! authority on resumed sessions.

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemorySnapshotStore, SnapshotStore, StorageError, StoredAnswer, StoredProgress,
};
pub use sqlite::{SqliteInitError, SqliteSnapshotStore};
