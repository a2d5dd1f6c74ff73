//! File storage primitives.

mod atomic_json;
mod config_file;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use config_file::ConfigFile;
