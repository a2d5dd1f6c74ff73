pub mod json_session_repository;
pub mod memory_session_repository;
pub mod paths;
pub mod storage;

pub use json_session_repository::JsonSessionRepository;
pub use memory_session_repository::MemorySessionRepository;
pub use paths::{SESSION_STORAGE_KEY, ShopdeskPaths};
