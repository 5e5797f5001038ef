//! Key-value persistence seam used by the session timer.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

/// Key holding the live countdown and session counters.
pub const STATE_KEY: &str = "timer.state";
/// Key holding the user's timer settings.
pub const SETTINGS_KEY: &str = "timer.settings";
/// Key holding the task list.
pub const TASKS_KEY: &str = "timer.tasks";
/// Key holding the aggregated statistics.
pub const STATS_KEY: &str = "timer.stats";
/// Key holding the next task id, so ids of deleted tasks are never reused.
pub const TASK_COUNTER_KEY: &str = "timer.nextTaskId";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory: {0}")]
    Directory(#[from] std::io::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// String key-value storage. Values are JSON documents.
pub trait KeyValueStore {
    /// Returns the stored value, or `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// while the timer owns another and later "reload" from it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
