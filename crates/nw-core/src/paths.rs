//! Layout of the web-server configuration tree.
//!
//! This module provides [`ConfigPaths`], the single source of truth for where
//! configuration files live: the root directory, the main file inside it, and
//! the four conventional site/stream subdirectories. All consumers resolve
//! paths through it rather than joining strings themselves.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default name of the main configuration file.
pub const DEFAULT_MAIN_FILE: &str = "nginx.conf";

/// Directory holding all defined HTTP site configurations.
pub const SITES_AVAILABLE_DIR: &str = "sites-available";

/// Directory holding symlinks to the active HTTP site configurations.
pub const SITES_ENABLED_DIR: &str = "sites-enabled";

/// Directory holding all defined stream (TCP/UDP) configurations.
pub const STREAM_AVAILABLE_DIR: &str = "stream-available";

/// Directory holding symlinks to the active stream configurations.
pub const STREAM_ENABLED_DIR: &str = "stream-enabled";

/// Locations of the configuration tree on disk.
///
/// Wraps the configuration root and the main file name, and derives every
/// other path from them: the four site/stream subdirectories and the
/// resolution of relative `include` arguments.
///
/// # Examples
///
/// ```
/// use nw_core::ConfigPaths;
///
/// let paths = ConfigPaths::new("/etc/nginx");
/// assert_eq!(paths.main_file_path(), "/etc/nginx/nginx.conf");
/// assert_eq!(paths.sites_enabled(), "/etc/nginx/sites-enabled");
/// assert_eq!(paths.resolve("sites-enabled/a.conf"), "/etc/nginx/sites-enabled/a.conf");
/// assert_eq!(paths.resolve("/opt/extra.conf"), "/opt/extra.conf");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPaths {
    /// Root of the configuration tree (e.g. `/etc/nginx`).
    pub root: Utf8PathBuf,

    /// Name of the main configuration file inside the root.
    pub main_file: String,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::new(),
            main_file: DEFAULT_MAIN_FILE.to_owned(),
        }
    }
}

impl ConfigPaths {
    /// Creates the path layout for the given configuration root.
    ///
    /// The main file name defaults to [`DEFAULT_MAIN_FILE`].
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            main_file: DEFAULT_MAIN_FILE.to_owned(),
        }
    }

    /// Returns a copy with a different main file name.
    #[must_use]
    pub fn with_main_file(mut self, name: impl Into<String>) -> Self {
        self.main_file = name.into();
        self
    }

    /// The configuration root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of the main configuration file.
    #[inline]
    #[must_use]
    pub fn main_file_path(&self) -> Utf8PathBuf {
        self.root.join(&self.main_file)
    }

    /// Path of the `sites-available` directory.
    #[inline]
    #[must_use]
    pub fn sites_available(&self) -> Utf8PathBuf {
        self.root.join(SITES_AVAILABLE_DIR)
    }

    /// Path of the `sites-enabled` directory.
    #[inline]
    #[must_use]
    pub fn sites_enabled(&self) -> Utf8PathBuf {
        self.root.join(SITES_ENABLED_DIR)
    }

    /// Path of the `stream-available` directory.
    #[inline]
    #[must_use]
    pub fn stream_available(&self) -> Utf8PathBuf {
        self.root.join(STREAM_AVAILABLE_DIR)
    }

    /// Path of the `stream-enabled` directory.
    #[inline]
    #[must_use]
    pub fn stream_enabled(&self) -> Utf8PathBuf {
        self.root.join(STREAM_ENABLED_DIR)
    }

    /// The four site/stream subdirectories, in scan order.
    #[must_use]
    pub fn subdirectories(&self) -> [Utf8PathBuf; 4] {
        [
            self.sites_available(),
            self.sites_enabled(),
            self.stream_available(),
            self.stream_enabled(),
        ]
    }

    /// Resolves an `include` argument against the configuration root.
    ///
    /// Absolute arguments are returned unchanged; relative ones are joined
    /// onto the root, matching how the server itself resolves includes.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Utf8PathBuf {
        let path = Utf8Path::new(raw);
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }

    /// Validates that the layout points at a usable configuration tree.
    ///
    /// The root must be set, exist, and be a directory. The subdirectories
    /// are optional and deliberately not checked here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_str().is_empty() {
            return Err(ConfigError::InvalidPath {
                path: self.root.clone(),
                reason: "configuration root is not set".to_owned(),
            });
        }
        if !self.root.exists() {
            return Err(ConfigError::MissingDirectory(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: self.root.clone(),
                reason: "not a directory".to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = ConfigPaths::default();
        assert_eq!(paths.main_file, DEFAULT_MAIN_FILE);
        assert!(paths.root.as_str().is_empty());
    }

    #[test]
    fn test_derived_paths() {
        let paths = ConfigPaths::new("/etc/nginx");
        assert_eq!(paths.main_file_path(), "/etc/nginx/nginx.conf");
        assert_eq!(paths.sites_available(), "/etc/nginx/sites-available");
        assert_eq!(paths.sites_enabled(), "/etc/nginx/sites-enabled");
        assert_eq!(paths.stream_available(), "/etc/nginx/stream-available");
        assert_eq!(paths.stream_enabled(), "/etc/nginx/stream-enabled");
    }

    #[test]
    fn test_subdirectories_order() {
        let paths = ConfigPaths::new("/etc/nginx");
        let dirs = paths.subdirectories();
        assert_eq!(dirs[0], paths.sites_available());
        assert_eq!(dirs[1], paths.sites_enabled());
        assert_eq!(dirs[2], paths.stream_available());
        assert_eq!(dirs[3], paths.stream_enabled());
    }

    #[test]
    fn test_custom_main_file() {
        let paths = ConfigPaths::new("/srv/proxy").with_main_file("proxy.conf");
        assert_eq!(paths.main_file_path(), "/srv/proxy/proxy.conf");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let paths = ConfigPaths::new("/etc/nginx");
        assert_eq!(
            paths.resolve("sites-enabled/site.conf"),
            "/etc/nginx/sites-enabled/site.conf"
        );
        assert_eq!(paths.resolve("/opt/extra.conf"), "/opt/extra.conf");
    }

    #[test]
    fn test_validate_unset_root() {
        let paths = ConfigPaths::default();
        assert!(matches!(
            paths.validate(),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_validate_missing_root() {
        let paths = ConfigPaths::new("/definitely/not/a/real/dir");
        assert!(matches!(
            paths.validate(),
            Err(ConfigError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_validate_root_must_be_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let file = dir.path().join("nginx.conf");
        std::fs::write(&file, "events {}\n").expect("failed to write file");

        let paths = ConfigPaths::new(file.to_str().expect("temp path should be UTF-8"));
        assert!(matches!(
            paths.validate(),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let paths = ConfigPaths::new(dir.path().to_str().expect("temp path should be UTF-8"));
        assert!(paths.validate().is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let paths = ConfigPaths::new("/etc/nginx").with_main_file("custom.conf");
        let json = serde_json::to_string(&paths).unwrap();
        let parsed: ConfigPaths = serde_json::from_str(&json).unwrap();
        assert_eq!(paths, parsed);
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let json = r#"{"root": "/etc/nginx"}"#;
        let paths: ConfigPaths = serde_json::from_str(json).unwrap();
        assert_eq!(paths.root, "/etc/nginx");
        assert_eq!(paths.main_file, DEFAULT_MAIN_FILE);
    }
}
