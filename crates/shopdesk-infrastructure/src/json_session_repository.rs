//! File-backed session repository.

use crate::paths::ShopdeskPaths;
use crate::storage::AtomicJsonFile;
use shopdesk_core::Result;
use shopdesk_core::session::{
    PERSISTED_SESSION_VERSION, PersistedSession, Session, SessionRepository,
};
use std::path::{Path, PathBuf};

/// Stores the session as `{ "state": ..., "version": 1 }` in
/// `auth-storage.json`.
pub struct JsonSessionRepository {
    file: AtomicJsonFile<PersistedSession>,
}

impl JsonSessionRepository {
    /// Repository rooted at `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::with_path(ShopdeskPaths::session_file_in(data_dir))
    }

    /// Creates a new repository with a custom file path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl SessionRepository for JsonSessionRepository {
    fn load(&self) -> Result<Option<Session>> {
        let Some(record) = self.file.load()? else {
            return Ok(None);
        };

        if record.version != PERSISTED_SESSION_VERSION {
            // Unknown layouts are discarded; the user signs in again.
            tracing::warn!(
                "[SessionRepository] Ignoring session record version {} at {}",
                record.version,
                self.path().display()
            );
            return Ok(None);
        }

        Ok(Some(record.state))
    }

    fn save(&self, session: &Session) -> Result<()> {
        self.file.save(&PersistedSession::new(session.clone()))?;
        Ok(())
    }
}
