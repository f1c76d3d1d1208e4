//! Object store configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Filesystem object store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreConfig {
    /// Directory holding every stored object
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl ObjectStoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("OBJECT_STORE_ROOT"));
        }
        Ok(())
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./data/objects")
}
