use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for a [`ContentStore`](crate::ContentStore).
///
/// Every field has a default, so a TOML file only needs the keys it
/// overrides:
///
/// ```toml
/// base_path = "/var/lib/hoard"
/// spool_threshold = 1048576
/// sync = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Root directory holding the shard directories.
    pub base_path: PathBuf,
    /// Name of the dependency index directory under `base_path`.
    pub index_dir: String,
    /// Bytes of a single-pass source buffered in memory before spilling to
    /// a temporary file.
    pub spool_threshold: usize,
    /// `fsync` every object before moving it into place.
    pub sync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("hoard"),
            index_dir: ".deps".to_string(),
            spool_threshold: 8 * 1024 * 1024, // 8 MiB
            sync: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    /// Directory of the on-disk dependency index.
    pub fn index_path(&self) -> PathBuf {
        self.base_path.join(&self.index_dir)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Reject settings that would corrupt the on-disk layout.
    ///
    /// The index directory must be a single path component and must not look
    /// like a shard (two hex characters), or object enumeration would treat
    /// index records as objects.
    pub fn validate(&self) -> StoreResult<()> {
        if self.base_path.as_os_str().is_empty() {
            return Err(StoreError::Config("base_path is empty".into()));
        }
        let name = self.index_dir.as_str();
        if name.is_empty() || name == "." || name == ".." {
            return Err(StoreError::Config(format!("invalid index_dir {name:?}")));
        }
        if name.contains(['/', '\\']) {
            return Err(StoreError::Config(format!(
                "index_dir {name:?} must be a single path component"
            )));
        }
        if name.len() == 2 && name.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StoreError::Config(format!(
                "index_dir {name:?} collides with a shard directory"
            )));
        }
        Ok(())
    }
}
