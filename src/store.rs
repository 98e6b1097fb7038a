use rusqlite::Connection;
use std::path::Path;

/// Record names, one per persisted collection.
pub const KEY_QUESTIONS: &str = "questions";
pub const KEY_CATEGORIES: &str = "categories";
pub const KEY_SAVED_QUIZZES: &str = "savedQuizzes";
pub const KEY_SESSIONS: &str = "sessions";
pub const KEY_CURRENT_SESSION: &str = "currentSession";

pub const ALL_KEYS: [&str; 5] = [
    KEY_QUESTIONS,
    KEY_CATEGORIES,
    KEY_SAVED_QUIZZES,
    KEY_SESSIONS,
    KEY_CURRENT_SESSION,
];

/// Soft cap on total stored bytes (keys + values).
pub const DEFAULT_CAPACITY_BYTES: usize = 4 * 1024 * 1024;

pub const DB_FILE_NAME: &str = "quizd.sqlite3";

#[derive(Debug)]
pub enum StoreError {
    /// The write would push the store past its capacity cap.
    Capacity,
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Capacity => write!(f, "store capacity exceeded"),
            StoreError::Backend(msg) => write!(f, "store backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Durable named-record storage. Injected so the repository and retention
/// policy run against an in-memory fake in tests.
pub trait Store {
    /// Returns the stored value, or `None` when absent or unreadable.
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Best-effort removal; removing an absent key is a no-op.
    fn remove(&mut self, key: &str);
    fn used_bytes(&self) -> usize;
}

/// Write a record, recovering once from capacity exhaustion: run the retention
/// cleanup, then retry exactly once. The outcome is a boolean so callers can
/// surface a non-fatal warning; data already committed is never touched.
pub fn write_with_fallback(store: &mut dyn Store, key: &str, value: &str) -> bool {
    match store.set(key, value) {
        Ok(()) => true,
        Err(StoreError::Capacity) => {
            crate::retention::cleanup(store);
            match store.set(key, value) {
                Ok(()) => true,
                Err(e) => {
                    eprintln!("quizd: write of '{}' still failing after cleanup: {}", key, e);
                    false
                }
            }
        }
        Err(e) => {
            eprintln!("quizd: write of '{}' failed: {}", key, e);
            false
        }
    }
}

/// Key-value store backed by a single-table SQLite database in the workspace
/// directory. SQLite has no quota of its own, so the capacity cap is enforced
/// here before each write.
pub struct SqliteStore {
    conn: Connection,
    capacity_bytes: usize,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<SqliteStore> {
        std::fs::create_dir_all(workspace)?;
        let db_path = workspace.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS records(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(SqliteStore {
            conn,
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
        })
    }

    fn entry_bytes(&self, key: &str) -> usize {
        self.conn
            .query_row(
                "SELECT LENGTH(key) + LENGTH(value) FROM records WHERE key = ?",
                [key],
                |r| r.get::<_, i64>(0),
            )
            .map(|n| n.max(0) as usize)
            .unwrap_or(0)
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> Option<String> {
        match self
            .conn
            .query_row("SELECT value FROM records WHERE key = ?", [key], |r| {
                r.get::<_, String>(0)
            }) {
            Ok(v) => Some(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => {
                eprintln!("quizd: read of '{}' failed, treating as absent: {}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let projected = self.used_bytes() - self.entry_bytes(key) + key.len() + value.len();
        if projected > self.capacity_bytes {
            return Err(StoreError::Capacity);
        }
        self.conn
            .execute(
                "INSERT INTO records(key, value) VALUES(?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                (key, value),
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        if let Err(e) = self.conn.execute("DELETE FROM records WHERE key = ?", [key]) {
            eprintln!("quizd: remove of '{}' failed: {}", key, e);
        }
    }

    fn used_bytes(&self) -> usize {
        self.conn
            .query_row(
                "SELECT COALESCE(SUM(LENGTH(key) + LENGTH(value)), 0) FROM records",
                [],
                |r| r.get::<_, i64>(0),
            )
            .map(|n| n.max(0) as usize)
            .unwrap_or(0)
    }
}

/// In-memory store for unit tests.
#[cfg(test)]
pub struct MemoryStore {
    map: std::collections::BTreeMap<String, String>,
    capacity_bytes: usize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            map: std::collections::BTreeMap::new(),
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
        }
    }

    pub fn with_capacity(capacity_bytes: usize) -> MemoryStore {
        MemoryStore {
            map: std::collections::BTreeMap::new(),
            capacity_bytes,
        }
    }
}

#[cfg(test)]
impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let old = self.map.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
        let projected = self.used_bytes() - old + key.len() + value.len();
        if projected > self.capacity_bytes {
            return Err(StoreError::Capacity);
        }
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
    }

    fn used_bytes(&self) -> usize {
        self.map.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}
