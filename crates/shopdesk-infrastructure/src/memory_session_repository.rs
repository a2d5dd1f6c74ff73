//! Non-durable session repository.

use shopdesk_core::Result;
use shopdesk_core::session::{Session, SessionRepository};
use std::sync::Mutex;

/// Keeps the record in memory only. Used when durable storage is disabled
/// and as an isolated store in tests.
#[derive(Default)]
pub struct MemorySessionRepository {
    record: Mutex<Option<Session>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `session`.
    pub fn with_session(session: Session) -> Self {
        Self {
            record: Mutex::new(Some(session)),
        }
    }

    /// The last saved record.
    pub fn stored(&self) -> Option<Session> {
        self.record.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SessionRepository for MemorySessionRepository {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.stored())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }
}
