//! Unified path management for shopdesk files.
//!
//! ```text
//! ~/.config/shopdesk/          # Config directory
//! └── config.toml              # Client configuration
//!
//! ~/.local/share/shopdesk/     # Data directory
//! └── auth-storage.json        # Persisted session record
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "shopdesk";

/// Fixed storage key of the persisted session record.
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for shopdesk_core::ShopdeskError {
    fn from(e: PathError) -> Self {
        shopdesk_core::ShopdeskError::config(e.to_string())
    }
}

pub struct ShopdeskPaths;

impl ShopdeskPaths {
    /// Platform config directory (e.g. `~/.config/shopdesk/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Platform data directory (e.g. `~/.local/share/shopdesk/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Session record inside `data_dir`.
    pub fn session_file_in(data_dir: &std::path::Path) -> PathBuf {
        data_dir.join(format!("{SESSION_STORAGE_KEY}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_file_uses_storage_key() {
        let path = ShopdeskPaths::session_file_in(std::path::Path::new("/tmp/shopdesk"));
        assert_eq!(path, PathBuf::from("/tmp/shopdesk/auth-storage.json"));
    }
}
