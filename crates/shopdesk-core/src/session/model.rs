//! Session domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Version tag written alongside the persisted session record.
pub const PERSISTED_SESSION_VERSION: u32 = 1;

/// The closed set of roles the back office recognises.
///
/// Wire and storage names are the camelCase strings the remote API uses
/// (`superAdmin`, `bulkOrder`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
    BulkOrder,
    OperationManager,
}

/// The client-held record of the current authenticated actor and tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque bearer credential.
    pub token: Option<String>,
    /// Absolute expiry of `token`.
    pub expires_at: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
    pub role: Option<Role>,
    /// Selected tenant (business) that scopes data visibility.
    pub active_business: Option<String>,
    /// True iff `token` is set and `expires_at` was in the future at the last check.
    #[serde(default)]
    pub is_authenticated: bool,
}

impl Session {
    /// Creates an empty, unauthenticated session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session carries an expiry that is not in the future.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if expires_at <= now)
    }

    /// The role, only when the session is authenticated.
    pub fn effective_role(&self) -> Option<Role> {
        if self.is_authenticated { self.role } else { None }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Nulls every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Server-confirmed tenant and role, from the business-info endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub business: String,
    pub role: Role,
}

/// The durable record stored under the session storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: Session,
    pub version: u32,
}

impl PersistedSession {
    pub fn new(state: Session) -> Self {
        Self {
            state,
            version: PERSISTED_SESSION_VERSION,
        }
    }
}
