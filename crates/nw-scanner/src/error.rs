//! Error types for the nw-scanner crate.
//!
//! This module provides the [`ScanError`] type for errors that can occur
//! while scanning the configuration tree and watching it for changes.

use camino::Utf8PathBuf;

use nw_watcher::WatchError;

/// Errors that can occur during scanning operations.
///
/// These errors cover watcher setup failures, file I/O errors, and
/// lifecycle misuse.
///
/// # Error Recovery Strategy
///
/// - **Watcher errors** ([`ScanError::Watch`]): Fatal at initialization -
///   the scanner stays uninitialized
/// - **File read errors** ([`ScanError::Read`]): Log warning, skip file,
///   continue scan
/// - **Shut down** ([`ScanError::ShutDown`]): Fatal - the scanner lifecycle
///   is terminal
/// - **Task errors** ([`ScanError::Task`]): Fatal - a blocking scan task
///   did not complete
///
/// # Examples
///
/// ```
/// use nw_scanner::ScanError;
///
/// fn handle_error(err: ScanError) {
///     match err {
///         ScanError::Watch(e) => eprintln!("Watcher error: {e}"),
///         ScanError::Read { path, .. } => eprintln!("Read error: {path}"),
///         ScanError::ShutDown => eprintln!("Scanner already shut down"),
///         ScanError::Task(e) => eprintln!("Scan task error: {e}"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Failed to create or operate the filesystem watcher.
    ///
    /// During initialization this is fatal; when arming an optional
    /// directory it is logged and skipped.
    #[error("filesystem watcher error: {0}")]
    Watch(#[from] WatchError),

    /// Failed to read a configuration file.
    ///
    /// Contains the path that failed and the underlying I/O error.
    /// Scanning can continue by skipping this file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The path of the file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The scanner has been shut down.
    ///
    /// Shutdown is terminal; a shut-down scanner cannot be re-initialized.
    #[error("scanner has been shut down")]
    ShutDown,

    /// A blocking scan task failed to complete.
    ///
    /// Scans run on the blocking thread pool; this surfaces a panicked or
    /// cancelled task.
    #[error("scan task failed to complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ScanError {
    /// Creates a new [`ScanError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    ///
    /// Recoverable errors are file- or directory-specific issues that don't
    /// prevent scanning other files.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Read { .. } => true,
            Self::Watch(e) => e.is_recoverable(),
            Self::ShutDown | Self::Task(_) => false,
        }
    }

    /// Returns `true` if this error is fatal (the operation should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. } => Some(path),
            Self::Watch(e) => e.path(),
            Self::ShutDown | Self::Task(_) => None,
        }
    }
}
