//! Durable record store for conversation sessions
//!
//! One self-contained JSON document per session, named by session id and
//! kept under a dedicated data directory. Writes go to a temporary file
//! first and become visible atomically via rename, so a reader never
//! observes a half-written record. Corruption is isolated to a single
//! session rather than a shared index.

use crate::error::{ChatvaultError, Result};
use anyhow::Context;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub mod types;
pub use types::{
    ConversationHistory, ConversationPreview, ConversationRecord, Role, Turn, DEFAULT_TITLE,
    PREVIEW_MAX_CHARS, TITLE_MAX_CHARS,
};

/// File-backed store mapping session id to [`ConversationRecord`]
///
/// The store performs no locking across operations; per-session mutual
/// exclusion is the conversation manager's responsibility.
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the default data directory
    ///
    /// Resolves to the per-user application data directory, honoring a
    /// `CHATVAULT_DATA_DIR` environment override so tests and deployments
    /// can point at an alternate location without touching the user's data.
    pub fn new() -> Result<Self> {
        if let Ok(override_dir) = std::env::var("CHATVAULT_DATA_DIR") {
            return Self::new_with_dir(override_dir);
        }

        let proj_dirs = ProjectDirs::from("io", "chatvault", "chatvault")
            .ok_or_else(|| ChatvaultError::Storage("Could not determine data directory".into()))?;

        Self::new_with_dir(proj_dirs.data_dir().join("sessions"))
    }

    /// Create a store rooted at the specified directory
    ///
    /// The directory is created if it does not exist. This is the
    /// constructor used by tests with a temporary directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use chatvault::store::FileStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = FileStore::new_with_dir(dir.path()).unwrap();
    /// assert!(store.data_dir().exists());
    /// ```
    pub fn new_with_dir<P: Into<PathBuf>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .context("Failed to create data directory")
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;
        Ok(Self { data_dir })
    }

    /// Directory holding the session documents
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the document for a session id
    fn record_path(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.data_dir.join(format!("{}.json", session_id)))
    }

    /// Persist a record, creating or overwriting its document
    ///
    /// The full serialized document is written to a sibling temp file and
    /// renamed onto its final name, which is atomic on POSIX filesystems.
    ///
    /// # Errors
    ///
    /// Returns `ChatvaultError::Storage` on serialization or I/O failure.
    pub fn put(&self, record: &ConversationRecord) -> Result<()> {
        let path = self.record_path(&record.session_id)?;
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(record)
            .context("Failed to serialize conversation record")
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        fs::write(&tmp_path, &json)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to rename {} into place", tmp_path.display()))
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        tracing::debug!(
            session_id = %record.session_id,
            messages = record.messages.len(),
            "Persisted conversation record"
        );
        Ok(())
    }

    /// Load a record by session id
    ///
    /// Returns `Ok(None)` when no record exists; absence is not an error.
    /// A document that exists but cannot be read or parsed is a
    /// `ChatvaultError::Storage` error, never coerced into a default record.
    pub fn get(&self, session_id: &str) -> Result<Option<ConversationRecord>> {
        let path = self.record_path(session_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        let record: ConversationRecord = serde_json::from_str(&data)
            .with_context(|| format!("Malformed record in {}", path.display()))
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        Ok(Some(record))
    }

    /// Remove a record
    ///
    /// Returns whether a record existed to remove; deleting an absent
    /// session is not an error.
    pub fn delete(&self, session_id: &str) -> Result<bool> {
        let path = self.record_path(session_id)?;
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to delete {}", path.display()))
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        tracing::debug!(session_id = %session_id, "Deleted conversation record");
        Ok(true)
    }

    /// Enumerate every stored record
    ///
    /// Order is unspecified at this layer; listing order is the manager's
    /// responsibility. Entries that cannot be read or parsed are skipped
    /// with a warning so one corrupt session never poisons the listing.
    pub fn list_all(&self) -> Result<Vec<ConversationRecord>> {
        let entries = fs::read_dir(&self.data_dir)
            .with_context(|| format!("Failed to read {}", self.data_dir.display()))
            .map_err(|e| ChatvaultError::Storage(e.to_string()))?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry
                .context("Failed to read directory entry")
                .map_err(|e| ChatvaultError::Storage(e.to_string()))?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|data| serde_json::from_str::<ConversationRecord>(&data).map_err(Into::into))
            {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping unreadable record: {}", e);
                }
            }
        }

        Ok(records)
    }
}

/// Validate that a session id is safe to use as a file name component
///
/// Ids are UUID-shaped: ASCII alphanumerics and hyphens only. This keeps
/// path separators and relative components out of the data directory.
fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() || session_id.len() > 64 {
        return Err(ChatvaultError::Validation(format!(
            "Invalid session id: {:?}",
            session_id
        ))
        .into());
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ChatvaultError::Validation(format!(
            "Invalid session id: {:?}",
            session_id
        ))
        .into());
    }
    Ok(())
}
