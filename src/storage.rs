//! Local persistence for the one session record.
//!
//! The store is best effort: a missing, unreadable or corrupt record loads as
//! "no prior session" and never surfaces as an error.

use crate::model::PersistedSession;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "wikipath";
const SESSION_FILE: &str = "session.json";

pub trait SessionStore: Send {
    /// Overwrite the stored record.
    fn save(&mut self, record: &PersistedSession) -> Result<()>;
    /// Last saved record, or `None` when absent or unreadable.
    fn load(&self) -> Option<PersistedSession>;
    /// Remove the stored record. Clearing an absent record succeeds.
    fn clear(&mut self) -> Result<()>;
}

/// Directory holding the session record and the log file.
pub fn base_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_session_path() -> PathBuf {
    base_dir().join(SESSION_FILE)
}

/// Guarded parse: any failure means "no prior session".
fn parse_record(raw: &str) -> Option<PersistedSession> {
    match serde_json::from_str::<PersistedSession>(raw) {
        Ok(rec) => Some(rec),
        Err(e) => {
            warn!("ignoring unreadable session record: {e}");
            None
        }
    }
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Self {
        Self::new(default_session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn save(&mut self, record: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let body = serde_json::to_vec_pretty(record).context("serialize session record")?;
        // Write beside the target and rename so a crash never leaves half a record.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename into {}", self.path.display()))?;
        debug!(path = %self.path.display(), status = ?record.status, "session saved");
        Ok(())
    }

    fn load(&self) -> Option<PersistedSession> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), "cannot read session record: {e}");
                return None;
            }
        };
        parse_record(&raw)
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", self.path.display())),
        }
    }
}

#[cfg(test)]
/// In-memory store that still goes through JSON, so round-trips and corrupt
/// records behave as they do on disk.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    raw: Option<String>,
}

#[cfg(test)]
impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with arbitrary text, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

#[cfg(test)]
impl SessionStore for MemorySessionStore {
    fn save(&mut self, record: &PersistedSession) -> Result<()> {
        self.raw = Some(serde_json::to_string(record).context("serialize session record")?);
        Ok(())
    }

    fn load(&self) -> Option<PersistedSession> {
        self.raw.as_deref().and_then(parse_record)
    }

    fn clear(&mut self) -> Result<()> {
        self.raw = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PathResult, SearchQuery, TaskId};

    fn completed_record() -> PersistedSession {
        let q = SearchQuery::new("Albert Einstein", "Physics").unwrap();
        PersistedSession::completed(
            &q,
            PathResult {
                path: vec![
                    "Albert Einstein".into(),
                    "Science".into(),
                    "Physics".into(),
                ],
                search_time_seconds: 2.25,
                nodes_explored: 130,
            },
        )
        .unwrap()
    }

    #[test]
    fn file_store_round_trip_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        let rec = completed_record();

        store.save(&rec).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, rec);

        // Saving what was loaded changes nothing.
        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), rec);
    }

    #[test]
    fn file_store_overwrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path().join("session.json"));
        store.save(&completed_record()).unwrap();

        let q = SearchQuery::new("A", "B").unwrap();
        let next = PersistedSession::in_progress(&q, TaskId("t2".into()));
        store.save(&next).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, next);
        assert!(loaded.result.is_none());
    }

    #[test]
    fn corrupt_file_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{\"startPage\": 12, ").unwrap();
        let store = FileSessionStore::new(&path);
        assert!(store.load().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSessionStore::new(dir.path().join("session.json"));
        store.clear().unwrap();
        store.save(&completed_record()).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn memory_store_treats_garbage_as_absent() {
        let store = MemorySessionStore::with_raw("not json at all");
        assert!(store.load().is_none());

        let store = MemorySessionStore::with_raw(r#"{"status":"SOMETHING_ELSE"}"#);
        assert!(store.load().is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemorySessionStore::new();
        assert!(store.load().is_none());
        let rec = completed_record();
        store.save(&rec).unwrap();
        assert_eq!(store.load(), Some(rec));
        store.clear().unwrap();
        assert!(store.raw().is_none());
    }
}
