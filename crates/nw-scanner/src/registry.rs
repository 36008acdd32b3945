//! Callback registry for scan notifications.
//!
//! This module provides [`CallbackRegistry`], the append-only collection of
//! observers invoked with `(path, content)` for every file the scanner
//! touches. The registry is constructed independently of the scanner and
//! handed to it at construction, so collaborators can register themselves
//! before the scanner exists.

use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Signature of a scan callback.
///
/// Callbacks receive the path of the scanned file and its full content.
/// Returning an error marks this callback's processing of the file as
/// failed; the error is logged and neither other callbacks nor the scan
/// itself are affected.
pub type ScanCallback = Box<dyn Fn(&Utf8Path, &[u8]) -> anyhow::Result<()> + Send + Sync>;

/// An ordered, append-only registry of scan callbacks.
///
/// Cheaply cloneable; clones share the same callback list, so a handle can
/// be given to the scanner while collaborators keep registering through
/// their own. Callbacks are invoked in registration order for every scanned
/// file.
///
/// # Examples
///
/// ```
/// use nw_scanner::CallbackRegistry;
///
/// let registry = CallbackRegistry::new();
/// registry.register(|path, content| {
///     println!("{}: {} bytes", path, content.len());
///     Ok(())
/// });
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    callbacks: Arc<RwLock<Vec<ScanCallback>>>,
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback to the registry.
    ///
    /// Registration order is invocation order. There is no way to remove a
    /// callback; the registry lives as long as the process.
    pub fn register<F>(&self, callback: F)
    where
        F: Fn(&Utf8Path, &[u8]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.write().push(Box::new(callback));
        debug!(total = self.len(), "Registered scan callback");
    }

    /// Invokes every callback with the given file, in registration order.
    ///
    /// Callback errors are logged and swallowed; one failing callback never
    /// prevents the others from running.
    pub fn run_all(&self, path: &Utf8Path, content: &[u8]) {
        let callbacks = self.callbacks.read();
        for (index, callback) in callbacks.iter().enumerate() {
            if let Err(error) = callback(path, content) {
                warn!(path = %path, callback = index, error = %error, "Scan callback failed");
            }
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use parking_lot::Mutex;

    #[test]
    fn test_registry_starts_empty() {
        let registry = CallbackRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let sink = Arc::clone(&log);
            registry.register(move |_path, _content| {
                sink.lock().push(tag);
                Ok(())
            });
        }

        registry.run_all(Utf8Path::new("/etc/nginx/nginx.conf"), b"events {}\n");
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_callback_error_does_not_stop_others() {
        let registry = CallbackRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.register(|_path, _content| anyhow::bail!("boom"));
        let sink = Arc::clone(&log);
        registry.register(move |path, _content| {
            sink.lock().push(path.to_owned());
            Ok(())
        });

        registry.run_all(Utf8Path::new("/etc/nginx/nginx.conf"), b"");
        assert_eq!(
            *log.lock(),
            vec![Utf8PathBuf::from("/etc/nginx/nginx.conf")]
        );
    }

    #[test]
    fn test_clones_share_callbacks() {
        let registry = CallbackRegistry::new();
        let clone = registry.clone();

        clone.register(|_path, _content| Ok(()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_callbacks_receive_content() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        registry.register(move |_path, content| {
            sink.lock().push(content.to_vec());
            Ok(())
        });

        registry.run_all(Utf8Path::new("/etc/nginx/nginx.conf"), b"worker_processes 1;");
        assert_eq!(*seen.lock(), vec![b"worker_processes 1;".to_vec()]);
    }
}
