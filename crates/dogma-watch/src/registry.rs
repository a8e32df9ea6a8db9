use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dogma_model::{Path, Revision, is_eligible};
use dogma_pattern::{PathPattern, compile, matches as pattern_matches};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

use crate::error::RegistryError;
use crate::watch::{WatchHandle, WatchId, WatchIdAllocator, WatchOutcome};

/// Tunables for a [`Registry`]. Only the bucket-map capacity is currently
/// exposed; per the spec it bounds idle pattern *entries*, never the
/// number of live watches.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub bucket_capacity: usize,
}

impl RegistryConfig {
    pub fn new(bucket_capacity: usize) -> Self {
        Self { bucket_capacity }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { bucket_capacity: 8192 }
    }
}

struct WatchEntry {
    baseline: Revision,
    sender: oneshot::Sender<WatchOutcome>,
}

#[derive(Default)]
struct WatchBucket {
    ids: HashSet<WatchId>,
}

struct RegistryState {
    /// Access-ordered: `IndexMap` preserves insertion order, and `add`
    /// moves a touched pattern's entry to the back so the front is always
    /// the least-recently-used candidate for eviction.
    buckets: IndexMap<PathPattern, WatchBucket>,
    watches: HashMap<WatchId, WatchEntry>,
    closed: bool,
}

/// The commit-watch registry.
///
/// Delivers at-most-one notification per registered watch once a commit
/// advances past the watch's baseline revision on a path matching its
/// pattern. `Registry` is a cheap `Clone` over shared state: every clone
/// observes the same buckets, guarded by a single `parking_lot::Mutex`.
///
/// All mutation of the bucket map happens inside one short critical
/// section; completing a watch's future (sending on its `oneshot`) always
/// happens after the lock is released, so a caller's continuation can
/// never re-enter the registry while it holds the lock.
#[derive(Clone)]
pub struct Registry {
    config: RegistryConfig,
    state: Arc<Mutex<RegistryState>>,
    ids: Arc<WatchIdAllocator>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RegistryState {
                buckets: IndexMap::new(),
                watches: HashMap::new(),
                closed: false,
            })),
            ids: Arc::new(WatchIdAllocator::default()),
        }
    }

    /// Registers interest in the first revision greater than `baseline`
    /// that touches a path matching `pattern`. Fails only if `pattern`
    /// does not compile or the registry has already been closed; in
    /// either case no watch is created, so there is nothing to unlink.
    #[instrument(skip(self), fields(baseline = %baseline, pattern))]
    pub fn add(&self, baseline: Revision, pattern: &str) -> Result<WatchHandle, RegistryError> {
        let compiled = compile(pattern)?;

        let mut state = self.state.lock();
        if state.closed {
            return Err(RegistryError::Closed("registry already closed".to_owned()));
        }

        let (sender, receiver) = oneshot::channel();
        let id = self.ids.next();
        state.watches.insert(id, WatchEntry { baseline, sender });

        match state.buckets.get_index_of(&compiled) {
            Some(idx) => {
                if let Some((_, bucket)) = state.buckets.get_index_mut(idx) {
                    bucket.ids.insert(id);
                }
                let last = state.buckets.len() - 1;
                state.buckets.move_index(idx, last);
            }
            None => {
                let mut bucket = WatchBucket::default();
                bucket.ids.insert(id);
                state.buckets.insert(compiled, bucket);
                evict_if_over_capacity(&mut state, self.config.bucket_capacity);
            }
        }

        debug!(watch = %id, "watch registered");
        Ok(WatchHandle::new(id, receiver))
    }

    /// Announces that `revision` touched `path`. Every watch whose pattern
    /// matches `path` and whose baseline is strictly older than `revision`
    /// is delivered `revision` exactly once and unlinked; watches whose
    /// baseline is already at or past `revision` are left pending.
    ///
    /// As a side effect, any watch in a scanned bucket whose caller has
    /// already dropped its [`WatchHandle`] is unlinked too, which is the
    /// "lazy" half of cancellation detection the spec allows ("next scan
    /// or upon the holder's completion-callback firing").
    ///
    /// Callers must call `notify` with monotonically increasing revisions;
    /// the registry trusts this precondition (documented, not enforced;
    /// see the crate's design notes on out-of-order revisions) rather than
    /// policing the storage engine's ordering contract.
    #[instrument(skip(self), fields(revision = %revision, path = %path))]
    pub fn notify(&self, revision: Revision, path: &Path) {
        let mut completed: Vec<(WatchId, oneshot::Sender<WatchOutcome>)> = Vec::new();

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            for (pattern, bucket) in state.buckets.iter_mut() {
                if bucket.ids.is_empty() || !pattern_matches(pattern, path.as_str()) {
                    continue;
                }

                let mut to_unlink = Vec::new();
                for &id in bucket.ids.iter() {
                    let Some(entry) = state.watches.get(&id) else {
                        to_unlink.push(id);
                        continue;
                    };
                    if entry.sender.is_closed() {
                        // Caller dropped the handle before we got here.
                        to_unlink.push(id);
                    } else if is_eligible(entry.baseline, revision) {
                        to_unlink.push(id);
                    } else {
                        debug!(
                            watch = %id,
                            baseline = %entry.baseline,
                            "watch retained: baseline is not older than the notified revision"
                        );
                    }
                }

                for id in to_unlink {
                    bucket.ids.remove(&id);
                    if let Some(entry) = state.watches.remove(&id)
                        && !entry.sender.is_closed()
                    {
                        completed.push((id, entry.sender));
                    }
                }
            }
        }

        for (id, sender) in completed {
            debug!(watch = %id, revision = %revision, "watch notified");
            let _ = sender.send(Ok(revision));
        }
    }

    /// Terminates every outstanding watch. Watches whose caller has already
    /// dropped the handle are silently discarded (there is no one left to
    /// observe a failure); every other watch's future resolves to the
    /// error `cause` produces. `cause` is invoked at most once, and only
    /// if there is at least one watch to complete.
    ///
    /// Idempotent: calling `close` again (or calling `add` afterward)
    /// observes `RegistryError::Closed` without touching already-drained
    /// state.
    #[instrument(skip(self, cause))]
    pub fn close(&self, cause: impl FnOnce() -> RegistryError) {
        let mut completed = Vec::new();
        {
            let mut state = self.state.lock();
            state.closed = true;
            for (_, entry) in state.watches.drain() {
                if !entry.sender.is_closed() {
                    completed.push(entry.sender);
                }
            }
            state.buckets.clear();
        }

        if completed.is_empty() {
            return;
        }

        let error = cause();
        warn!(outstanding = completed.len(), %error, "registry closed with outstanding watches");
        for sender in completed {
            let _ = sender.send(Err(error.clone()));
        }
    }

    /// Number of distinct patterns currently tracked, live or idle. Exposed
    /// for tests and operational introspection; not part of the spec's
    /// contract.
    pub fn bucket_count(&self) -> usize {
        self.state.lock().buckets.len()
    }
}

fn evict_if_over_capacity(state: &mut RegistryState, capacity: usize) {
    if state.buckets.len() <= capacity {
        return;
    }
    // Scan from the front (least-recently-used) for the first empty
    // bucket; non-empty buckets are never evicted regardless of age, so
    // the cap is advisory whenever every bucket is live.
    if let Some(idx) = state.buckets.iter().position(|(_, bucket)| bucket.ids.is_empty()) {
        state.buckets.shift_remove_index(idx);
    }
}
