//! Session repository trait.
//!
//! Defines the persistence port the session store mirrors itself to.

use super::model::Session;
use crate::error::Result;

/// Durable storage for the single session record.
///
/// Implementations decide where the record lives (a JSON file, memory, ...).
/// Calls are synchronous: the store persists on every transition and the
/// navigation guard runs without suspension.
pub trait SessionRepository: Send + Sync {
    /// Reads the stored session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: A record was found
    /// - `Ok(None)`: Nothing stored yet
    /// - `Err(_)`: The record could not be read or parsed
    fn load(&self) -> Result<Option<Session>>;

    /// Overwrites the stored record with `session`.
    fn save(&self, session: &Session) -> Result<()>;
}
