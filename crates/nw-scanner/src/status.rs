//! Scanning-status broadcast.
//!
//! The scanner publishes a boolean "scanning in progress" signal. Internally
//! the signal is a reentrancy depth: every scan (top-level or nested through
//! includes) increments it on entry and decrements it on exit, but only the
//! 0→1 and 1→0 edges are broadcast, so overlapping scans produce exactly one
//! `true`/`false` pair.
//!
//! Transitions flow through a small bounded queue to a broadcaster task,
//! which fans them out to per-subscriber bounded queues. Every push along
//! the way is non-blocking: a full queue drops the update rather than
//! stalling a scan. Delivery is best-effort; the signal is a progress hint,
//! not a synchronization primitive.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, trace, warn};

use nw_core::FxHashMap;

/// Capacity of the internal transition queue feeding the broadcaster task.
pub const STATUS_CHANNEL_CAPACITY: usize = 10;

/// Capacity of each subscriber's queue.
///
/// A subscriber that stops draining its queue silently loses updates once
/// these slots are full.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 5;

/// Fan-out hub for the scanning status signal.
///
/// Owns the scan depth counter, the internal transition queue, and the
/// subscriber set. One broadcaster task per hub forwards transitions to
/// subscribers; it exits when the hub shuts down.
pub(crate) struct StatusBroadcaster {
    /// Number of scans currently in flight (including nested include scans).
    depth: RwLock<u32>,

    /// Sending side of the internal transition queue.
    ///
    /// `None` after shutdown; dropping the sender stops the broadcaster.
    queue_tx: Mutex<Option<mpsc::Sender<bool>>>,

    /// Live subscriber queues, keyed by subscription id.
    subscribers: RwLock<FxHashMap<u64, mpsc::Sender<bool>>>,

    /// Next subscription id.
    next_id: AtomicU64,
}

impl StatusBroadcaster {
    /// Creates a hub and spawns its broadcaster task.
    pub(crate) fn spawn() -> Arc<Self> {
        let (tx, rx) = mpsc::channel(STATUS_CHANNEL_CAPACITY);
        let hub = Arc::new(Self {
            depth: RwLock::new(0),
            queue_tx: Mutex::new(Some(tx)),
            subscribers: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(0),
        });
        tokio::spawn(Self::run(Arc::clone(&hub), rx));
        hub
    }

    /// Forwards transitions from the internal queue to every subscriber.
    async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<bool>) {
        while let Some(scanning) = rx.recv().await {
            let subscribers = self.subscribers.read();
            for (id, tx) in subscribers.iter() {
                match tx.try_send(scanning) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        trace!(subscriber = id, "Subscriber queue full, dropping status update");
                    }
                    // Receiver dropped without unsubscribing; cleaned up
                    // whenever the subscriber is removed.
                    Err(TrySendError::Closed(_)) => {}
                }
            }
        }
        debug!("Status broadcaster stopped");
    }

    /// Marks a scan as started, returning a guard that marks it finished.
    ///
    /// Broadcasts `true` only when this is the outermost scan.
    pub(crate) fn begin_scan(self: &Arc<Self>) -> ScanGuard {
        {
            let mut depth = self.depth.write();
            *depth += 1;
            if *depth == 1 {
                self.push(true);
            }
        }
        ScanGuard {
            hub: Arc::clone(self),
        }
    }

    /// Marks a scan as finished; broadcasts `false` on the last one out.
    fn end_scan(&self) {
        let mut depth = self.depth.write();
        *depth = depth.saturating_sub(1);
        if *depth == 0 {
            self.push(false);
        }
    }

    /// Non-blocking push onto the internal transition queue.
    ///
    /// Called with the depth lock held, which keeps queued transitions in
    /// depth order; blocking here is therefore never an option.
    fn push(&self, scanning: bool) {
        let guard = self.queue_tx.lock();
        let Some(tx) = guard.as_ref() else { return };
        match tx.try_send(scanning) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(scanning, "Status queue full, dropping transition");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Returns `true` while any scan is in flight.
    pub(crate) fn is_scanning(&self) -> bool {
        *self.depth.read() > 0
    }

    /// Creates a subscription primed with the current status.
    ///
    /// The snapshot goes into the queue before the sender is registered,
    /// and the depth lock is held across both steps, so the snapshot can
    /// never be reordered after a later transition.
    pub(crate) fn subscribe(&self) -> StatusSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);

        let depth = self.depth.read();
        let _ = tx.try_send(*depth > 0);
        self.subscribers.write().insert(id, tx);
        drop(depth);

        debug!(subscriber = id, "Status subscription created");
        StatusSubscription { id, rx }
    }

    /// Removes a subscription.
    ///
    /// Already-queued updates remain readable; once drained, the stream
    /// reports end-of-stream.
    pub(crate) fn unsubscribe(&self, subscription: &StatusSubscription) {
        if self.subscribers.write().remove(&subscription.id).is_some() {
            debug!(subscriber = subscription.id, "Status subscription removed");
        }
    }

    /// Drops every subscriber queue and closes the internal queue.
    ///
    /// Subscribers observe end-of-stream; the broadcaster task exits.
    pub(crate) fn shutdown(&self) {
        self.subscribers.write().clear();
        *self.queue_tx.lock() = None;
    }
}

/// RAII guard pairing [`StatusBroadcaster::begin_scan`] with its end.
///
/// Held for the duration of a scan; dropping it (on success and error paths
/// alike) decrements the depth and broadcasts `false` on the 1→0 edge.
pub(crate) struct ScanGuard {
    hub: Arc<StatusBroadcaster>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.hub.end_scan();
    }
}

/// A live subscription to the scanning status signal.
///
/// Yields `true` when scanning begins and `false` when it ends, primed with
/// one snapshot of the status at subscription time. The stream ends (recv
/// returns `None`) after the subscription is removed or the scanner shuts
/// down.
#[derive(Debug)]
pub struct StatusSubscription {
    id: u64,
    rx: mpsc::Receiver<bool>,
}

impl StatusSubscription {
    /// Receives the next status value.
    ///
    /// Returns `None` once the subscription has been removed (or the
    /// scanner shut down) and all queued values have been drained.
    pub async fn recv(&mut self) -> Option<bool> {
        self.rx.recv().await
    }

    /// Receives the next status value without waiting.
    pub fn try_recv(&mut self) -> Result<bool, TryRecvError> {
        self.rx.try_recv()
    }

    /// The subscription's id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn recv_within(sub: &mut StatusSubscription, what: &str) -> Option<bool> {
        timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
    }

    #[tokio::test]
    async fn test_snapshot_is_false_when_idle() {
        let hub = StatusBroadcaster::spawn();
        let mut sub = hub.subscribe();
        assert_eq!(recv_within(&mut sub, "snapshot").await, Some(false));
    }

    #[tokio::test]
    async fn test_scan_broadcasts_true_then_false() {
        let hub = StatusBroadcaster::spawn();
        let mut sub = hub.subscribe();
        assert_eq!(recv_within(&mut sub, "snapshot").await, Some(false));

        let guard = hub.begin_scan();
        assert_eq!(recv_within(&mut sub, "scan start").await, Some(true));
        drop(guard);
        assert_eq!(recv_within(&mut sub, "scan end").await, Some(false));
    }

    #[tokio::test]
    async fn test_nested_scans_toggle_once() {
        let hub = StatusBroadcaster::spawn();
        let mut sub = hub.subscribe();
        assert_eq!(recv_within(&mut sub, "snapshot").await, Some(false));

        let outer = hub.begin_scan();
        let inner = hub.begin_scan();
        assert!(hub.is_scanning());
        drop(inner);
        assert!(hub.is_scanning());
        drop(outer);
        assert!(!hub.is_scanning());

        assert_eq!(recv_within(&mut sub, "scan start").await, Some(true));
        assert_eq!(recv_within(&mut sub, "scan end").await, Some(false));

        // The inner scan must not have produced extra transitions.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_is_scanning_tracks_depth() {
        let hub = StatusBroadcaster::spawn();
        assert!(!hub.is_scanning());
        let guard = hub.begin_scan();
        assert!(hub.is_scanning());
        drop(guard);
        assert!(!hub.is_scanning());
    }

    #[tokio::test]
    async fn test_full_subscriber_queue_drops_updates() {
        let hub = StatusBroadcaster::spawn();
        let mut stalled = hub.subscribe();

        // Never drained: the snapshot plus the first transitions fill all
        // five slots; everything after that is dropped without blocking.
        let scans = timeout(Duration::from_secs(5), async {
            for _ in 0..4 {
                let guard = hub.begin_scan();
                drop(guard);
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(scans.is_ok(), "a stalled subscriber blocked scanning");

        // A fresh subscriber is unaffected.
        let mut fresh = hub.subscribe();
        assert_eq!(recv_within(&mut fresh, "fresh snapshot").await, Some(false));

        // The stalled queue holds at most its capacity, snapshot included.
        let mut drained = 0;
        while stalled.try_recv().is_ok() {
            drained += 1;
        }
        assert!(drained <= SUBSCRIBER_CHANNEL_CAPACITY);
        assert!(drained >= 1, "snapshot should always be delivered");
    }

    #[tokio::test]
    async fn test_unsubscribe_ends_stream_after_drain() {
        let hub = StatusBroadcaster::spawn();
        let mut sub = hub.subscribe();
        hub.unsubscribe(&sub);

        // Snapshot was queued before removal; it drains, then the stream ends.
        assert_eq!(recv_within(&mut sub, "buffered snapshot").await, Some(false));
        assert_eq!(recv_within(&mut sub, "end of stream").await, None);
    }

    #[tokio::test]
    async fn test_unsubscribed_subscription_misses_transitions() {
        let hub = StatusBroadcaster::spawn();
        let mut sub = hub.subscribe();
        assert_eq!(recv_within(&mut sub, "snapshot").await, Some(false));

        hub.unsubscribe(&sub);
        let guard = hub.begin_scan();
        drop(guard);

        assert_eq!(recv_within(&mut sub, "end of stream").await, None);
    }

    #[tokio::test]
    async fn test_shutdown_ends_all_streams() {
        let hub = StatusBroadcaster::spawn();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.shutdown();

        assert_eq!(recv_within(&mut first, "snapshot").await, Some(false));
        assert_eq!(recv_within(&mut first, "end of stream").await, None);
        assert_eq!(recv_within(&mut second, "snapshot").await, Some(false));
        assert_eq!(recv_within(&mut second, "end of stream").await, None);
    }

    #[tokio::test]
    async fn test_subscription_ids_are_unique() {
        let hub = StatusBroadcaster::spawn();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_ne!(a.id(), b.id());
    }
}
