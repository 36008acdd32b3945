//! Event types for directory change notifications.
//!
//! This module provides [`WatchEvent`], the crate's representation of a
//! single filesystem change, and [`WatchEventKind`], the classification the
//! scanner's watch loop dispatches on. Raw `notify` events carry one kind and
//! possibly several paths; the watcher flattens them into one [`WatchEvent`]
//! per path.

use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use notify::EventKind;
use notify::event::{ModifyKind, RenameMode};

/// Classification of a filesystem change.
///
/// This is a deliberate reduction of `notify`'s event taxonomy to the four
/// kinds the scanner reacts to. Access events and metadata-only changes
/// (permission bits, timestamps) produce no [`WatchEventKind`] at all and are
/// dropped at the source.
///
/// # Examples
///
/// ```
/// use nw_watcher::WatchEventKind;
/// use notify::EventKind;
/// use notify::event::CreateKind;
///
/// let kind = WatchEventKind::from_notify(&EventKind::Create(CreateKind::File));
/// assert_eq!(kind, Some(WatchEventKind::Created));
/// assert!(!WatchEventKind::Created.is_removal());
/// assert!(WatchEventKind::Removed.is_removal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// A file or directory appeared, either created in place or moved in.
    Created,
    /// A file's contents were written.
    Modified,
    /// A file or directory was renamed away, or a move was reported as a
    /// paired source/destination event.
    Renamed,
    /// A file or directory was removed.
    Removed,
}

impl WatchEventKind {
    /// Maps a raw `notify` event kind onto the scanner's classification.
    ///
    /// A move destination ([`RenameMode::To`]) counts as [`Created`]: the
    /// path appeared at that location, whatever happened to the source.
    ///
    /// Returns `None` for kinds the scanner ignores: access events,
    /// metadata-only modifications, and events of unknown kind.
    ///
    /// [`Created`]: Self::Created
    #[must_use]
    pub const fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    /// Returns `true` if this kind reports a removal.
    #[inline]
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// A single filesystem change event.
///
/// Carries the affected path, the change classification, and the instant the
/// event crossed from the watcher thread into the async runtime.
///
/// # Examples
///
/// ```
/// use nw_watcher::{WatchEvent, WatchEventKind};
/// use camino::Utf8PathBuf;
///
/// let event = WatchEvent::new(
///     Utf8PathBuf::from("/etc/nginx/nginx.conf"),
///     WatchEventKind::Modified,
/// );
/// assert_eq!(event.path, "/etc/nginx/nginx.conf");
/// assert!(!event.is_removal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// The path that changed.
    pub path: Utf8PathBuf,

    /// What happened to the path.
    pub kind: WatchEventKind,

    /// When the event was observed.
    pub timestamp: Instant,
}

impl WatchEvent {
    /// Creates a new event with the current timestamp.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: WatchEventKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Creates a new event with an explicit timestamp.
    #[inline]
    #[must_use]
    pub const fn with_timestamp(path: Utf8PathBuf, kind: WatchEventKind, timestamp: Instant) -> Self {
        Self {
            path,
            kind,
            timestamp,
        }
    }

    /// The affected path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns `true` if this event reports a removal.
    #[inline]
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        self.kind.is_removal()
    }
}
