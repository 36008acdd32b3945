//! Configuration-tree scanner with filesystem watching.
//!
//! This crate is the discovery and change-tracking engine for an nginx-style
//! configuration directory. It reads the main configuration file, the
//! `sites-available` and `stream-available` directories, and everything
//! reachable through `include` directives, delivering each file's content to
//! registered callbacks and re-scanning automatically when files change on
//! disk.
//!
//! # Overview
//!
//! The main entry point is [`ConfigScanner`], which combines:
//!
//! - [`CallbackRegistry`]: Append-only list of per-file callbacks
//! - [`DirWatcher`](nw_watcher::DirWatcher): Non-recursive directory watching
//!   with a watch set that grows as directories appear
//! - Include resolution: `include` directives matched with `regex`, glob
//!   arguments expanded with `glob`
//! - [`StatusSubscription`]: Bounded, best-effort stream of the boolean
//!   "scanning in progress" signal
//!
//! # Example
//!
//! ```ignore
//! use nw_core::{ConfigPaths, ScanConfig};
//! use nw_scanner::ConfigScanner;
//!
//! let paths = ConfigPaths::new("/etc/nginx");
//! let scanner = ConfigScanner::new(paths, ScanConfig::default()).await;
//!
//! scanner.register_callback(|path, content| {
//!     println!("{path}: {} bytes", content.len());
//!     Ok(())
//! });
//!
//! // Scan once, start watching, and keep re-scanning on changes.
//! scanner.initialize().await?;
//!
//! let mut status = scanner.subscribe();
//! while let Some(scanning) = status.recv().await {
//!     println!("scanning: {scanning}");
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ConfigScanner
//!     │
//!     ├── scan passes (spawn_blocking)
//!     │       │
//!     │       ├── include resolution (regex + glob)
//!     │       └── CallbackRegistry (per-file fan-out)
//!     │
//!     ├── file event loop (nw-watcher)
//!     │       │
//!     │       ├── removal ──────────► full rescan
//!     │       ├── new directory ───► grow watch set
//!     │       └── file change ─────► settle delay → single-file scan
//!     │
//!     ├── periodic rescan timer (tokio interval)
//!     │
//!     └── status broadcast (bounded queues, drop on full)
//! ```
//!
//! # Performance
//!
//! - **I/O**: Scan passes run on the blocking thread pool; the async runtime
//!   stays responsive throughout
//! - **Matching**: The include-directive regex is compiled once per process
//! - **Status**: Fan-out never blocks a scan; full subscriber queues drop
//!   updates instead
//! - **Dedup**: Visited-path tracking is O(files) per pass with `FxHashSet`

#![deny(clippy::all)]
#![warn(missing_docs)]

mod error;
mod includes;
mod registry;
mod status;

pub use error::ScanError;
pub use registry::{CallbackRegistry, ScanCallback};
pub use status::{STATUS_CHANNEL_CAPACITY, SUBSCRIBER_CHANNEL_CAPACITY, StatusSubscription};

use std::fmt;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use nw_core::{ConfigPaths, FxHashSet, ScanConfig, fx_hash_set};
use nw_watcher::{DirWatcher, WatchEvent, WatchEventKind};

use status::StatusBroadcaster;

/// Outcome of one scan pass.
///
/// Counts every file the pass visited, whether reached from the main
/// configuration file, a scanned directory, or an `include` directive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSummary {
    /// Files read successfully and delivered to callbacks.
    pub scanned: usize,
    /// Files that could not be read.
    pub failed: usize,
}

impl ScanSummary {
    /// Total number of files visited.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.scanned + self.failed
    }

    /// Returns `true` when every visited file was read successfully.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Background tasks and watcher handle, populated by `initialize()`.
#[derive(Default)]
struct Lifecycle {
    initialized: bool,
    shut_down: bool,
    watcher: Option<Arc<DirWatcher>>,
    cancel: CancellationToken,
    event_task: Option<JoinHandle<()>>,
    rescan_task: Option<JoinHandle<()>>,
}

/// Scanner for an nginx-style configuration tree.
///
/// A full pass reads the main file, then every non-directory entry of
/// `sites-available` and `stream-available` in name order, recursing through
/// `include` directives as it goes. Each successfully read file is handed to
/// every registered callback as `(path, content)`.
///
/// [`initialize()`](Self::initialize) performs the first pass and then keeps
/// the tree current: watched directories feed a single-file rescan per
/// changed file (after a short settle delay), removals trigger a full
/// rescan, newly created directories join the watch set, and a periodic
/// timer re-scans everything as a safety net.
///
/// # Cloning
///
/// `ConfigScanner` is cheaply cloneable; clones share the callback registry,
/// status broadcast, and lifecycle state.
#[derive(Clone)]
pub struct ConfigScanner {
    /// Locations within the configuration tree.
    paths: Arc<ConfigPaths>,
    /// Timing knobs (settle delay, rescan interval).
    config: ScanConfig,
    /// Callbacks invoked per scanned file.
    callbacks: CallbackRegistry,
    /// Scanning-status fan-out.
    status: Arc<StatusBroadcaster>,
    /// Watcher handle and background tasks.
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl fmt::Debug for ConfigScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigScanner")
            .field("paths", &self.paths)
            .field("config", &self.config)
            .field("callbacks", &self.callbacks.len())
            .field("scanning", &self.status.is_scanning())
            .finish_non_exhaustive()
    }
}

impl ConfigScanner {
    /// Creates a scanner for the given configuration tree.
    ///
    /// Nothing is scanned or watched yet; call
    /// [`initialize()`](Self::initialize) to start, or
    /// [`scan_all()`](Self::scan_all) for a one-shot pass.
    pub async fn new(paths: ConfigPaths, config: ScanConfig) -> Self {
        Self::with_registry(paths, config, CallbackRegistry::new()).await
    }

    /// Creates a scanner around an existing callback registry.
    ///
    /// Use this when callbacks are registered before the scanner is
    /// constructed. The registry is shared: registrations through either
    /// handle are seen by every subsequent scan.
    #[allow(clippy::unused_async)] // Async so the status broadcaster lands on the caller's runtime
    pub async fn with_registry(
        paths: ConfigPaths,
        config: ScanConfig,
        callbacks: CallbackRegistry,
    ) -> Self {
        let scanner = Self {
            paths: Arc::new(paths),
            config,
            callbacks,
            status: StatusBroadcaster::spawn(),
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
        };
        debug!(root = %scanner.paths.root, "Created configuration scanner");
        scanner
    }

    /// Performs the initial scan and starts watching for changes.
    ///
    /// This method:
    /// 1. Creates the filesystem watcher
    /// 2. Runs a full scan pass
    /// 3. Watches the configuration root and its standard subdirectories
    /// 4. Spawns the file event loop and the periodic rescan timer
    ///
    /// Calling it again on an initialized scanner is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Watch`] if the watcher cannot be created,
    /// [`ScanError::ShutDown`] after [`shutdown()`](Self::shutdown), and
    /// [`ScanError::Task`] if the initial scan task fails to complete.
    /// Unreadable files are counted and logged, not returned as errors.
    pub async fn initialize(&self) -> Result<(), ScanError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.shut_down {
            return Err(ScanError::ShutDown);
        }
        if lifecycle.initialized {
            debug!("Scanner already initialized");
            return Ok(());
        }

        let (watcher, events) = DirWatcher::new()?;
        let watcher = Arc::new(watcher);

        let summary = self.scan_all().await?;
        info!(
            scanned = summary.scanned,
            failed = summary.failed,
            "Initial configuration scan complete"
        );

        self.arm_watches(&watcher);

        let cancel = lifecycle.cancel.clone();
        let event_task = tokio::spawn(run_event_loop(
            self.clone(),
            Arc::clone(&watcher),
            events,
            cancel.clone(),
        ));
        let rescan_task = tokio::spawn(run_rescan_timer(
            self.clone(),
            self.config.rescan_interval(),
            cancel,
        ));

        lifecycle.watcher = Some(watcher);
        lifecycle.event_task = Some(event_task);
        lifecycle.rescan_task = Some(rescan_task);
        lifecycle.initialized = true;

        info!(root = %self.paths.root, "Configuration scanner initialized");
        Ok(())
    }

    /// Stops watching and ends every status subscription.
    ///
    /// Scans already in flight run to completion. Idempotent; afterwards
    /// [`initialize()`](Self::initialize) fails with [`ScanError::ShutDown`].
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.shut_down {
            return;
        }
        lifecycle.shut_down = true;

        lifecycle.cancel.cancel();
        if let Some(watcher) = lifecycle.watcher.take() {
            watcher.shutdown();
        }
        if let Some(task) = lifecycle.event_task.take() {
            let _ = task.await;
        }
        if let Some(task) = lifecycle.rescan_task.take() {
            let _ = task.await;
        }
        self.status.shutdown();

        info!("Configuration scanner stopped");
    }

    /// Scans the whole configuration tree once.
    ///
    /// Visits the main file, then the `sites-available` and
    /// `stream-available` directories in name order, recursing through
    /// `include` directives. Every successfully read file is delivered to
    /// every registered callback; each file is visited at most once per
    /// pass, so include cycles terminate.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Task`] if the blocking scan task fails to
    /// complete. Unreadable files are counted in the summary instead.
    pub async fn scan_all(&self) -> Result<ScanSummary, ScanError> {
        let scanner = self.clone();
        let summary = tokio::task::spawn_blocking(move || scanner.scan_all_blocking()).await?;
        Ok(summary)
    }

    /// Scans a single file and whatever its `include` directives reach.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Read`] if `path` itself cannot be read and
    /// [`ScanError::Task`] if the blocking scan task fails to complete.
    /// Failures on included files are counted in the summary instead.
    pub async fn scan_file(&self, path: &Utf8Path) -> Result<ScanSummary, ScanError> {
        let scanner = self.clone();
        let path = path.to_owned();
        tokio::task::spawn_blocking(move || scanner.scan_file_blocking(&path)).await?
    }

    /// Appends a callback invoked with `(path, content)` per scanned file.
    ///
    /// Callbacks run in registration order on the scanning thread; errors
    /// they return are logged and do not stop the scan.
    pub fn register_callback<F>(&self, callback: F)
    where
        F: Fn(&Utf8Path, &[u8]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.register(callback);
    }

    /// Returns `true` while any scan is in flight.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.status.is_scanning()
    }

    /// Subscribes to the scanning status signal.
    ///
    /// The subscription is primed with a snapshot of the current status and
    /// then receives `true`/`false` on scan start/end. Its queue holds
    /// [`SUBSCRIBER_CHANNEL_CAPACITY`] values; a subscriber that falls
    /// behind loses updates rather than slowing scans down.
    #[must_use]
    pub fn subscribe(&self) -> StatusSubscription {
        self.status.subscribe()
    }

    /// Removes a status subscription.
    ///
    /// The handle keeps yielding already-queued values, then reports
    /// end-of-stream.
    pub fn unsubscribe(&self, subscription: &StatusSubscription) {
        self.status.unsubscribe(subscription);
    }

    /// Returns the shared callback registry.
    #[must_use]
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    /// Returns the configuration tree locations.
    #[must_use]
    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Returns the scanner configuration.
    #[must_use]
    pub const fn config(&self) -> ScanConfig {
        self.config
    }

    /// Reacts to one filesystem event.
    async fn handle_event(&self, watcher: &DirWatcher, event: WatchEvent) {
        trace!(path = %event.path, kind = ?event.kind, "File event received");

        if event.is_removal() {
            debug!(path = %event.path, "Configuration file removed, rescanning tree");
            if let Err(error) = self.scan_all().await {
                warn!(error = %error, "Full rescan after file removal failed");
            }
            return;
        }

        if event.path.is_dir() {
            // A directory moved into the tree arrives as Created, or as
            // Renamed when the notifier pairs the move; both get a watch.
            if matches!(event.kind, WatchEventKind::Created | WatchEventKind::Renamed) {
                if let Err(error) = watcher.watch(&event.path) {
                    warn!(
                        path = %event.path,
                        error = %error,
                        "Failed to watch new configuration directory"
                    );
                }
            }
            return;
        }

        // Editors often fire several events per save; let the file settle
        // before reading it.
        tokio::time::sleep(self.config.settle_delay()).await;

        match self.scan_file(&event.path).await {
            Ok(_) => {}
            Err(error) if error.is_recoverable() => {
                debug!(path = %event.path, error = %error, "Changed file could not be scanned");
            }
            Err(error) => {
                warn!(path = %event.path, error = %error, "Scan of changed file failed");
            }
        }
    }

    /// Watches the root and whichever standard subdirectories exist.
    fn arm_watches(&self, watcher: &DirWatcher) {
        if let Err(error) = watcher.watch(self.paths.root()) {
            warn!(path = %self.paths.root, error = %error, "Failed to watch configuration root");
        }
        for dir in self.paths.subdirectories() {
            if !dir.is_dir() {
                debug!(path = %dir, "Skipping missing configuration directory");
                continue;
            }
            if let Err(error) = watcher.watch(&dir) {
                warn!(path = %dir, error = %error, "Failed to watch configuration directory");
            }
        }
    }

    /// Full scan pass; runs on the blocking thread pool.
    fn scan_all_blocking(&self) -> ScanSummary {
        let _guard = self.status.begin_scan();
        let mut visited = fx_hash_set();
        let mut summary = ScanSummary::default();

        debug!(root = %self.paths.root, "Scanning configuration tree");

        self.scan_file_recursive(&self.paths.main_file_path(), &mut visited, &mut summary);
        self.scan_available_dir(&self.paths.sites_available(), &mut visited, &mut summary);
        self.scan_available_dir(&self.paths.stream_available(), &mut visited, &mut summary);

        debug!(
            scanned = summary.scanned,
            failed = summary.failed,
            "Configuration tree scan finished"
        );
        summary
    }

    /// Single-file scan pass; runs on the blocking thread pool.
    fn scan_file_blocking(&self, path: &Utf8Path) -> Result<ScanSummary, ScanError> {
        let _guard = self.status.begin_scan();

        let content = fs::read(path).map_err(|source| ScanError::read(path, source))?;
        debug!(path = %path, bytes = content.len(), "Scanning changed configuration file");

        let mut visited = fx_hash_set();
        visited.insert(path.to_owned());
        let mut summary = ScanSummary {
            scanned: 1,
            failed: 0,
        };

        self.callbacks.run_all(path, &content);
        for target in includes::include_targets(&content, &self.paths) {
            self.scan_file_recursive(&target, &mut visited, &mut summary);
        }

        Ok(summary)
    }

    /// Reads one file, delivers it to callbacks, and follows its includes.
    ///
    /// `visited` holds the paths already scanned this pass, keyed textually:
    /// a symlink and its target count as different files.
    fn scan_file_recursive(
        &self,
        path: &Utf8Path,
        visited: &mut FxHashSet<Utf8PathBuf>,
        summary: &mut ScanSummary,
    ) {
        if !visited.insert(path.to_owned()) {
            trace!(path = %path, "Skipping already scanned file");
            return;
        }

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(error) => {
                warn!(path = %path, error = %error, "Failed to read configuration file");
                summary.failed += 1;
                return;
            }
        };

        trace!(path = %path, bytes = content.len(), "Configuration file scanned");
        summary.scanned += 1;
        self.callbacks.run_all(path, &content);

        for target in includes::include_targets(&content, &self.paths) {
            self.scan_file_recursive(&target, visited, summary);
        }
    }

    /// Scans every non-directory entry of `dir` in name order.
    fn scan_available_dir(
        &self,
        dir: &Utf8Path,
        visited: &mut FxHashSet<Utf8PathBuf>,
        summary: &mut ScanSummary,
    ) {
        let entries = match dir.read_dir_utf8() {
            Ok(entries) => entries,
            Err(error) => {
                trace!(path = %dir, error = %error, "Configuration directory not readable, skipping");
                return;
            }
        };

        let mut files: Vec<Utf8PathBuf> = Vec::new();
        for entry in entries.flatten() {
            // Symlinks are kept: an entry is skipped only when it is a
            // directory in its own right.
            if entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            files.push(entry.into_path());
        }
        files.sort_unstable();

        for file in files {
            self.scan_file_recursive(&file, visited, summary);
        }
    }
}

/// Forwards watcher events to the scanner until cancelled.
async fn run_event_loop(
    scanner: ConfigScanner,
    watcher: Arc<DirWatcher>,
    mut events: mpsc::Receiver<WatchEvent>,
    cancel: CancellationToken,
) {
    debug!("File event loop started");

    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => {
                debug!("File event loop cancelled");
                break;
            }
            event = events.recv() => match event {
                Some(event) => event,
                None => {
                    debug!("File event channel closed");
                    break;
                }
            },
        };

        scanner.handle_event(&watcher, event).await;
    }

    debug!("File event loop ended");
}

/// Re-scans the whole tree on a fixed period until cancelled.
async fn run_rescan_timer(scanner: ConfigScanner, period: Duration, cancel: CancellationToken) {
    // interval_at panics on a zero period.
    if period.is_zero() {
        warn!("Rescan interval is zero, periodic rescan disabled");
        return;
    }

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(period_secs = period.as_secs(), "Periodic rescan timer started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Periodic rescan timer cancelled");
                break;
            }
            _ = ticker.tick() => {
                debug!("Periodic rescan triggered");
                if let Err(error) = scanner.scan_all().await {
                    warn!(error = %error, "Periodic rescan failed");
                }
            }
        }
    }
}
