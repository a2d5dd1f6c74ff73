//! Loading `config.toml` into [`ClientConfig`].

use shopdesk_core::config::ClientConfig;
use shopdesk_core::{Result, ShopdeskError};
use std::fs;
use std::path::{Path, PathBuf};

/// Read-only access to the client configuration file.
///
/// Responsibilities:
/// - Parse the TOML file into `ClientConfig` (missing file → defaults)
/// - Apply `SHOPDESK_*` environment overrides
/// - Validate the result
///
/// Does NOT write the file; operators edit it by hand.
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the file without overrides or validation.
    pub fn read(&self) -> Result<ClientConfig> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "[Config] {} not found, using defaults",
                    self.path.display()
                );
                return Ok(ClientConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        toml::from_str(&content).map_err(|e| ShopdeskError::Serialization {
            format: "TOML".to_string(),
            message: format!("{}: {}", self.path.display(), e),
        })
    }

    /// Parses, applies process environment overrides and validates.
    pub fn load(&self) -> Result<ClientConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(&self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = self.read()?;
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }
}
