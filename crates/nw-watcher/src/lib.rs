//! Directory watcher with async event streaming.
//!
//! This crate provides filesystem change detection via the `notify` crate,
//! bridged to an async tokio context for consumption by the config scanner's
//! event loop.
//!
//! # Overview
//!
//! The nw-watcher crate is designed to:
//!
//! - Detect changes in a web-server configuration tree
//! - Watch a growable set of directories, each non-recursively
//! - Classify raw notifications into the four kinds the scanner reacts to
//!   (created / modified / renamed / removed)
//! - Stream events asynchronously with bounded memory
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Notify Watcher Thread                        │
//! │  ┌──────────────────┐    ┌────────────────┐    ┌────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Kind mapping   │ -> │ UTF-8      │  │
//! │  │ (OS backend)     │    │ (drop ignored) │    │ validation │  │
//! │  └──────────────────┘    └────────────────┘    └─────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │  ┌──────────────────┐    ┌────────────────┐                     │
//! │  │ DirWatcher       │    │ mpsc::Receiver │ -> scanner event    │
//! │  │ (watch set ctrl) │    │ (events)       │    loop             │
//! │  └──────────────────┘    └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! nw-cli ──► nw-scanner ──► nw-watcher ──► nw-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use nw_watcher::{DirWatcher, WatchEventKind};
//! use camino::Utf8Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (watcher, mut events) = DirWatcher::new()?;
//!     watcher.watch(Utf8Path::new("/etc/nginx"))?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event.kind {
//!             WatchEventKind::Removed => println!("gone: {}", event.path),
//!             _ => println!("changed: {}", event.path),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! The crate uses [`WatchError`] for all error cases:
//!
//! ```
//! use nw_watcher::WatchError;
//!
//! fn handle_watch_error(err: WatchError) {
//!     if err.is_fatal() {
//!         // Stop watching, surface the error
//!         eprintln!("Fatal watcher error: {err}");
//!     } else {
//!         // Log and continue; the directory may appear later
//!         eprintln!("Warning: {err}");
//!     }
//! }
//! ```
//!
//! # Performance Considerations
//!
//! - **Filtering at Source**: Access and metadata-only events are dropped in
//!   the watcher thread before touching the channel.
//!
//! - **Bounded Channel**: The event channel holds 100 events by default; a
//!   slow consumer applies backpressure to the watcher thread instead of
//!   growing memory without bound.
//!
//! - **Non-recursive Watches**: Each directory is registered individually,
//!   so unrelated subtrees never generate events.
//!
//! - **UTF-8 Paths**: All paths are validated as UTF-8 at the source,
//!   avoiding repeated conversion overhead downstream.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod watcher;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{WatchEvent, WatchEventKind};

// Re-export watcher types
pub use watcher::DirWatcher;
