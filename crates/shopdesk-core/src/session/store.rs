//! The persisted session store.
//!
//! Single source of truth for authentication state. Every transition is
//! applied in memory first, broadcast to subscribers, and then mirrored to
//! the [`SessionRepository`]. A failed durable write never rolls the
//! in-memory state back; it is surfaced as
//! [`ShopdeskError::PersistenceDegraded`] and remembered in a flag.

use super::model::{BusinessInfo, Role, Session};
use super::repository::SessionRepository;
use crate::clock::Clock;
use crate::error::{Result, ShopdeskError};
use chrono::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

pub struct SessionStore {
    state: RwLock<Session>,
    repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    persistence_degraded: AtomicBool,
    changes: watch::Sender<Session>,
}

impl SessionStore {
    /// Creates a store holding an empty session. Nothing is read from storage.
    pub fn new(repository: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self::with_session(Session::new(), repository, clock)
    }

    /// Creates a store from the durably stored record.
    ///
    /// Read failures are logged and degrade to an empty session. A restored
    /// session whose expiry already passed is cleared straight away.
    pub fn restore(repository: Arc<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        let session = match repository.load() {
            Ok(Some(session)) => session,
            Ok(None) => Session::new(),
            Err(e) => {
                tracing::warn!("[SessionStore] Failed to read persisted session: {}", e);
                Session::new()
            }
        };

        let store = Self::with_session(session, repository, clock);
        if !store.check_auth_expiry() {
            tracing::info!("[SessionStore] Persisted session had expired; cleared on restore");
        }
        store
    }

    fn with_session(
        session: Session,
        repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (changes, _) = watch::channel(session.clone());
        Self {
            state: RwLock::new(session),
            repository,
            clock,
            persistence_degraded: AtomicBool::new(false),
            changes,
        }
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    /// The bearer token, if one is held.
    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn role(&self) -> Option<Role> {
        self.read().effective_role()
    }

    /// Whether the last durable write failed.
    pub fn is_persistence_degraded(&self) -> bool {
        self.persistence_degraded.load(Ordering::SeqCst)
    }

    /// Receives a new snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.changes.subscribe()
    }

    /// Records a successful login. The token is stored as given.
    pub fn set_auth(
        &self,
        token: impl Into<String>,
        expires_in_seconds: i64,
        user_id: impl Into<String>,
        role: Role,
    ) -> Result<()> {
        let expires_at = self.clock.now() + Duration::seconds(expires_in_seconds);
        let token = token.into();
        let user_id = user_id.into();

        tracing::debug!(
            "[SessionStore] set_auth user={} role={} expires_at={}",
            user_id,
            role,
            expires_at
        );

        self.transition(move |session| {
            session.token = Some(token);
            session.expires_at = Some(expires_at);
            session.user_id = Some(user_id);
            session.role = Some(role);
            session.is_authenticated = true;
        })
    }

    /// Optimistically selects a tenant before the server confirms it.
    pub fn set_business(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.transition(move |session| session.active_business = Some(name))
    }

    /// Applies the server-confirmed tenant and role.
    pub fn set_business_info(&self, info: BusinessInfo) -> Result<()> {
        self.transition(move |session| {
            session.active_business = Some(info.business);
            session.role = Some(info.role);
        })
    }

    /// Nulls every field and persists the cleared state.
    pub fn logout(&self) -> Result<()> {
        tracing::info!("[SessionStore] Logging out");
        self.transition(Session::clear)
    }

    /// Logs out when the stored expiry is not in the future.
    ///
    /// Returns `false` only in that case. An empty session has no expiry
    /// and is reported as not expired.
    pub fn check_auth_expiry(&self) -> bool {
        let now = self.clock.now();
        if !self.read().is_expired_at(now) {
            return true;
        }

        tracing::info!("[SessionStore] Session expired");
        if let Err(e) = self.logout() {
            tracing::warn!("[SessionStore] Expired session cleared in memory only: {}", e);
        }
        false
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn transition<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Session),
    {
        let snapshot = {
            let mut session = self.state.write().unwrap_or_else(|e| e.into_inner());
            f(&mut session);
            session.clone()
        };

        self.changes.send_replace(snapshot.clone());
        self.persist(&snapshot)
    }

    fn persist(&self, session: &Session) -> Result<()> {
        match self.repository.save(session) {
            Ok(()) => {
                self.persistence_degraded.store(false, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("[SessionStore] Failed to persist session: {}", e);
                self.persistence_degraded.store(true, Ordering::SeqCst);
                Err(ShopdeskError::PersistenceDegraded(e.to_string()))
            }
        }
    }
}
