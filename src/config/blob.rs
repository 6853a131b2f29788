//! Blob tier configuration (session-history storage)

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Blob storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    /// Root directory for session-history payloads
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl BlobConfig {
    /// Validate blob configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("BLOB_ROOT"));
        }
        Ok(())
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("/var/lib/thread-relay/sessions")
}
