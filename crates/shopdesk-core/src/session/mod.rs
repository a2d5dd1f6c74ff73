//! Session domain: the authenticated actor, its persistence port and store.

pub mod model;
pub mod repository;
pub mod store;

pub use model::{BusinessInfo, PERSISTED_SESSION_VERSION, PersistedSession, Role, Session};
pub use repository::SessionRepository;
pub use store::SessionStore;
