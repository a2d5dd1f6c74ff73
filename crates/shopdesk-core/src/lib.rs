pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod mutation;
pub mod navigation;
pub mod pricing;
pub mod query;
pub mod resource;
pub mod session;

// Re-export common error type
pub use error::{Result, ShopdeskError};
