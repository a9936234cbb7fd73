//! Configuration for the filesystem layer

use crate::{
    DEFAULT_COPY_BUFFER_SIZE, DEFAULT_RESERVED_PREFIX, DEFAULT_ROOT_MARKER, Result, VfsError,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the filesystem layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Application root; caller paths inside it are rewritten to
    /// translator-root form
    pub app_root: Option<PathBuf>,

    /// Marker prefixed to paths expressed relative to the translator root
    pub root_marker: String,

    /// Process-wide case policy
    pub case_sensitive: bool,

    /// Paths with this prefix belong to the host and are never routed
    pub reserved_prefix: String,

    /// Chunk size for stream copies (in bytes)
    pub copy_buffer_size: usize,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            app_root: None,
            root_marker: DEFAULT_ROOT_MARKER.to_string(),
            case_sensitive: platform_case_sensitive(),
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

/// Case policy mandated by the host platform.
pub const fn platform_case_sensitive() -> bool {
    !cfg!(any(windows, target_os = "macos"))
}

impl VfsConfig {
    /// Create a new configuration with the specified application root
    pub fn new<P: AsRef<Path>>(app_root: P) -> Self {
        Self {
            app_root: Some(app_root.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            VfsError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            VfsError::Config(format!("invalid JSON in {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the application root
    #[must_use]
    pub fn with_app_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.app_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the translator root marker
    #[must_use]
    pub fn with_root_marker(mut self, marker: impl Into<String>) -> Self {
        self.root_marker = marker.into();
        self
    }

    /// Override the case policy
    #[must_use]
    pub const fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set the reserved host prefix
    #[must_use]
    pub fn with_reserved_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reserved_prefix = prefix.into();
        self
    }

    /// Set the copy chunk size
    #[must_use]
    pub const fn with_copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size;
        self
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `VfsError::Config` if:
    /// - the application root is relative
    /// - the root marker is empty
    /// - the copy buffer size is zero
    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.app_root
            && !root.is_absolute()
        {
            return Err(VfsError::Config(format!(
                "application root must be absolute: {}",
                root.display()
            )));
        }

        if self.root_marker.is_empty() {
            return Err(VfsError::Config("root marker must not be empty".to_string()));
        }

        if self.copy_buffer_size == 0 {
            return Err(VfsError::Config(
                "copy buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = VfsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.root_marker, "//");
        assert_eq!(config.reserved_prefix, ":");
        assert!(config.app_root.is_none());
    }

    #[test]
    fn test_relative_app_root_rejected() {
        let config = VfsConfig::default().with_app_root("relative/dir");
        assert!(matches!(config.validate(), Err(VfsError::Config(_))));
    }

    #[test]
    fn test_empty_marker_rejected() {
        let config = VfsConfig::default().with_root_marker("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_copy_buffer_rejected() {
        let config = VfsConfig::default().with_copy_buffer_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "case_sensitive": false, "copy_buffer_size": 4096 }}"#)
            .expect("write config");

        let config = VfsConfig::from_json_file(file.path()).expect("load config");
        assert!(!config.case_sensitive);
        assert_eq!(config.copy_buffer_size, 4096);
        assert_eq!(config.root_marker, "//");
    }

    #[test]
    fn test_from_json_file_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write config");

        let err = VfsConfig::from_json_file(file.path()).expect_err("must fail");
        assert!(err.to_string().contains("invalid JSON"));
    }
}
