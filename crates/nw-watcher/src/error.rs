//! Error types for the nw-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! during directory watching operations.

use camino::Utf8PathBuf;

/// Errors that can occur during directory watching operations.
///
/// These errors cover watcher initialization failures, path validation,
/// and use-after-shutdown.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the OS watcher
///   could not be created or operated
/// - **Path not found** ([`WatchError::PathNotFound`]): Recoverable - the
///   directory may simply not exist yet; skip it and continue
/// - **Stopped** ([`WatchError::Stopped`]): Fatal - the watcher has been
///   shut down and accepts no further directories
///
/// # Examples
///
/// ```
/// use nw_watcher::WatchError;
/// use camino::Utf8PathBuf;
///
/// fn handle_error(err: WatchError) {
///     match err {
///         WatchError::Notify(e) => eprintln!("Notify error: {e}"),
///         WatchError::PathNotFound(p) => eprintln!("Path not found: {p}"),
///         WatchError::Stopped => eprintln!("Watcher already shut down"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    ///
    /// This is typically a fatal error that prevents watching from continuing.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified directory does not exist.
    ///
    /// Watch registration requires an existing directory; absent optional
    /// directories are expected and skipped by callers.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watcher has been shut down.
    ///
    /// Once shut down, a watcher accepts no further watch registrations.
    #[error("watcher has been shut down")]
    Stopped,
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    ///
    /// Recoverable errors are directory-specific issues that don't affect
    /// watches already in place. A missing directory is recoverable: the
    /// caller skips it and may retry when a creation event arrives.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::PathNotFound(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the directory path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_) | Self::Stopped => None,
        }
    }
}
