//! Fast cache store: a string-keyed text file used for last-known-good
//! reads and snapshots. Keys mirror the original layout:
//! `student_data_<id>`, `all_students`, and `user`.
//!
//! Reads that fail to parse degrade to "absent" and are logged; this store
//! is never allowed to fail a session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use crate::models::{SessionUser, StudentRecord};

pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl CacheStore {
    /// Loads the cache file if it exists; a missing or unreadable file
    /// starts the store empty.
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(map) => map,
                Err(err) => {
                    warn!(path = %path.display(), %err, "cache file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), %err, "cache file unreadable, starting empty");
                BTreeMap::new()
            }
        };
        CacheStore {
            path: path.to_path_buf(),
            entries,
        }
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set_text(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        self.persist()
    }

    fn persist(&self) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write cache file {}", self.path.display()))
    }

    fn student_key(student_id: &str) -> String {
        format!("student_data_{student_id}")
    }

    pub fn student_record(&self, student_id: &str) -> Option<StudentRecord> {
        let text = self.get_text(&Self::student_key(student_id))?;
        match serde_json::from_str(text) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(student_id, %err, "cached student record is corrupt, treating as absent");
                None
            }
        }
    }

    pub fn set_student_record(&mut self, record: &StudentRecord) -> anyhow::Result<()> {
        let text = serde_json::to_string(record)?;
        self.set_text(&Self::student_key(&record.id), text)
    }

    pub fn roster_snapshot(&self) -> Option<Vec<StudentRecord>> {
        let text = self.get_text("all_students")?;
        match serde_json::from_str(text) {
            Ok(roster) => Some(roster),
            Err(err) => {
                warn!(%err, "cached roster snapshot is corrupt, treating as absent");
                None
            }
        }
    }

    pub fn set_roster_snapshot(&mut self, roster: &[StudentRecord]) -> anyhow::Result<()> {
        let text = serde_json::to_string(roster)?;
        self.set_text("all_students", text)
    }

    /// Stored session identity. A corrupt entry is dropped so the next
    /// login starts clean.
    pub fn session_user(&mut self) -> Option<SessionUser> {
        let text = self.get_text("user")?;
        match serde_json::from_str(text) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(%err, "stored session is corrupt, logging out");
                let _ = self.remove("user");
                None
            }
        }
    }

    pub fn set_session_user(&mut self, user: &SessionUser) -> anyhow::Result<()> {
        let text = serde_json::to_string(user)?;
        self.set_text("user", text)
    }

    pub fn clear_session(&mut self) -> anyhow::Result<()> {
        self.remove("user")
    }
}
