use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dogma_model::Revision;
use tokio::sync::oneshot;

use crate::error::RegistryError;

/// A watch's terminal result: the revision it was notified with, or the
/// error the registry was closed with.
pub type WatchOutcome = Result<Revision, RegistryError>;

/// A monotonically assigned identity for a registered watch, standing in
/// for the object identity the source relies on for its watch sets (see
/// the crate's design notes): two watches with identical `(pattern,
/// baseline)` still get distinct ids and coexist in the same bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

impl WatchId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
pub(crate) struct WatchIdAllocator(AtomicU64);

impl WatchIdAllocator {
    pub(crate) fn next(&self) -> WatchId {
        WatchId(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// The caller's handle to a registered watch, returned by
/// [`crate::Registry::add`].
///
/// `WatchHandle` is itself a `Future<Output = WatchOutcome>`: awaiting it
/// suspends until the registry delivers a matching revision or the
/// registry is closed. Dropping the handle before either happens is how a
/// caller cancels: the paired [`tokio::sync::oneshot::Sender`] held by the
/// registry observes this via `is_closed()` the next time its bucket is
/// scanned and unlinks the watch lazily, exactly as the spec allows.
pub struct WatchHandle {
    id: WatchId,
    receiver: oneshot::Receiver<WatchOutcome>,
}

impl WatchHandle {
    pub(crate) fn new(id: WatchId, receiver: oneshot::Receiver<WatchOutcome>) -> Self {
        Self { id, receiver }
    }

    /// The id assigned to this watch at registration time.
    pub fn id(&self) -> WatchId {
        self.id
    }
}

impl Future for WatchHandle {
    type Output = WatchOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // The sender was dropped without sending. Only happens if the
            // registry drops a watch entry without completing it, which the
            // registry never does (every removal path sends). Treated as a
            // closed-registry outcome rather than panicking a caller.
            Poll::Ready(Err(_)) => Poll::Ready(Err(RegistryError::Closed(
                "watch was dropped by the registry without delivery".to_owned(),
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}
