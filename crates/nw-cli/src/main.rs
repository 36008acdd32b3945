//! CLI entry point for the ngxwatch configuration scanner.
//!
//! This binary scans an nginx-style configuration tree, following `include`
//! directives, and optionally keeps watching it for changes.
//!
//! # Usage
//!
//! ```bash
//! ngxwatch [OPTIONS] <COMMAND>
//!
//! # Scan once and show a summary
//! ngxwatch scan --root /etc/nginx
//!
//! # Scan once and emit a JSON report
//! ngxwatch scan --json
//!
//! # Watch for changes until interrupted
//! ngxwatch watch --root /etc/nginx --settle-ms 250
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use nw_core::{ConfigPaths, ScanConfig};
use nw_scanner::{ConfigScanner, ScanSummary};
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Scanner for nginx-style configuration trees.
///
/// Reads the main configuration file plus the `sites-available` and
/// `stream-available` directories, resolves `include` directives, and can
/// watch the tree to re-scan whatever changes.
#[derive(Parser)]
#[command(name = "ngxwatch", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Configuration root directory.
    ///
    /// Defaults to `/etc/nginx` if not specified.
    #[arg(short, long, global = true, env = "NGXWATCH_ROOT")]
    root: Option<Utf8PathBuf>,

    /// Main configuration file name within the root.
    ///
    /// Defaults to `nginx.conf` if not specified.
    #[arg(long, global = true, env = "NGXWATCH_MAIN_FILE")]
    main_file: Option<String>,

    /// Milliseconds to let a changed file settle before re-scanning it.
    #[arg(long, global = true, env = "NGXWATCH_SETTLE_MS")]
    settle_ms: Option<u64>,

    /// Seconds between periodic full rescans while watching.
    #[arg(long, global = true, env = "NGXWATCH_RESCAN_SECS")]
    rescan_secs: Option<u64>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan the configuration tree once and display a summary.
    Scan {
        /// Show the scanned file list.
        #[arg(short, long)]
        detailed: bool,

        /// Emit the result as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Scan, then keep watching the tree until interrupted.
    Watch,
}

/// One successfully scanned file, as reported by a scan pass.
#[derive(serde::Serialize)]
struct ScannedFile {
    /// Path of the file.
    path: Utf8PathBuf,
    /// Size of the content delivered to callbacks.
    bytes: usize,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. The
/// `notify` backend is filtered to `warn` level.
///
/// # Arguments
///
/// * `verbose` - Enable debug-level logging
/// * `no_color` - Disable ANSI colors in output
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds validated [`ConfigPaths`] from CLI arguments.
///
/// # Errors
///
/// Returns an error if the root does not exist or is not a directory.
fn build_paths(cli: &Cli) -> color_eyre::Result<ConfigPaths> {
    let root = cli
        .root
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from("/etc/nginx"));

    let mut paths = ConfigPaths::new(root);
    if let Some(main_file) = &cli.main_file {
        paths = paths.with_main_file(main_file.clone());
    }

    paths.validate()?;
    Ok(paths)
}

/// Builds a validated [`ScanConfig`] from CLI arguments.
///
/// # Errors
///
/// Returns an error if an option is out of range.
fn build_scan_config(cli: &Cli) -> color_eyre::Result<ScanConfig> {
    let mut config = ScanConfig::default();
    if let Some(millis) = cli.settle_ms {
        config = config.with_settle_delay_ms(millis);
    }
    if let Some(secs) = cli.rescan_secs {
        config = config.with_rescan_interval_secs(secs);
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs a one-shot scan with summary output.
///
/// # Arguments
///
/// * `paths` - The configuration tree locations
/// * `config` - The scanner configuration
/// * `detailed` - Whether to list every scanned file
/// * `json` - Whether to emit JSON instead of text
///
/// # Errors
///
/// Returns an error if the scan task fails or output cannot be written.
async fn run_scan(
    paths: ConfigPaths,
    config: ScanConfig,
    detailed: bool,
    json: bool,
) -> color_eyre::Result<()> {
    info!(root = %paths.root, "Starting scan");

    let scanner = ConfigScanner::new(paths, config).await;

    let files: Arc<Mutex<Vec<ScannedFile>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let files = Arc::clone(&files);
        scanner.register_callback(move |path, content| {
            files.lock().push(ScannedFile {
                path: path.to_owned(),
                bytes: content.len(),
            });
            Ok(())
        });
    }

    let summary = scanner.scan_all().await?;
    let files = std::mem::take(&mut *files.lock());

    if json {
        let report = generate_json_report(summary, &files)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{report}")?;
        return Ok(());
    }

    print_scan_summary(summary);
    if detailed {
        print_scanned_files(&files);
    }

    if summary.failed > 0 {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle)?;
        writeln!(
            handle,
            "{} file(s) could not be read; see log output for paths.",
            summary.failed
        )?;
    }

    Ok(())
}

/// Scans, watches for changes, and reports status until interrupted.
///
/// # Arguments
///
/// * `paths` - The configuration tree locations
/// * `config` - The scanner configuration
///
/// # Errors
///
/// Returns an error if initialization fails or signal handling breaks.
async fn run_watch(paths: ConfigPaths, config: ScanConfig) -> color_eyre::Result<()> {
    info!(
        root = %paths.root,
        settle_ms = config.settle_delay_ms,
        rescan_secs = config.rescan_interval_secs,
        "Starting watch"
    );

    let scanner = ConfigScanner::new(paths, config).await;
    scanner.register_callback(|path, content| {
        info!(path = %path, bytes = content.len(), "Configuration file scanned");
        Ok(())
    });

    scanner.initialize().await?;
    let mut subscription = scanner.subscribe();

    // Handle SIGTERM for graceful shutdown on Unix
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Received Ctrl-C, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                status = subscription.recv() => match status {
                    Some(scanning) => info!(scanning, "Scan status changed"),
                    None => break,
                },
            }
        }
    }

    #[cfg(not(unix))]
    {
        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Received Ctrl-C, shutting down");
                    break;
                }
                status = subscription.recv() => match status {
                    Some(scanning) => info!(scanning, "Scan status changed"),
                    None => break,
                },
            }
        }
    }

    scanner.shutdown().await;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a summary of the scan pass.
fn print_scan_summary(summary: ScanSummary) {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Configuration Scan Summary");
    let _ = writeln!(handle, "==========================");
    let _ = writeln!(handle);
    let _ = writeln!(handle, "Files scanned: {}", summary.scanned);
    let _ = writeln!(handle, "Files failed:  {}", summary.failed);
    let _ = writeln!(handle, "Total visited: {}", summary.total());
}

/// Prints the list of scanned files in scan order.
fn print_scanned_files(files: &[ScannedFile]) {
    if files.is_empty() {
        return;
    }

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let _ = writeln!(handle);
    let _ = writeln!(handle, "Scanned files ({}):", files.len());
    for file in files {
        let _ = writeln!(handle, "  {} ({} bytes)", file.path, file.bytes);
    }
}

/// Generates a JSON report of the scan pass.
fn generate_json_report(summary: ScanSummary, files: &[ScannedFile]) -> color_eyre::Result<String> {
    #[derive(serde::Serialize)]
    struct Report<'a> {
        summary: ScanSummary,
        files: &'a [ScannedFile],
    }

    let report = Report { summary, files };
    serde_json::to_string_pretty(&report)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Scan { detailed, json } => {
            let paths = build_paths(&cli)?;
            let config = build_scan_config(&cli)?;
            run_scan(paths, config, *detailed, *json).await
        }
        Commands::Watch => {
            let paths = build_paths(&cli)?;
            let config = build_scan_config(&cli)?;
            run_watch(paths, config).await
        }
    }
}
