/*!
 * Cancellation Token
 * Atomic cancel flag with wake subscriptions for parked threads
 */

use crate::core::limits::WAIT_SLICE;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Wake hook registered by a blocking primitive
///
/// Implementations notify the primitive's condvars so that threads parked
/// inside it re-check the token. `wake` is called after the cancel flag is
/// set and with no internal token lock held.
pub(crate) trait CancelWake: Send + Sync {
    fn wake(&self);
}

struct TokenInner {
    cancelled: AtomicBool,
    next_sub_id: AtomicU64,
    subscribers: DashMap<u64, Arc<dyn CancelWake>, RandomState>,
    /// Waiter support for `wait_cancelled`
    wait_lock: Mutex<()>,
    wait_cv: Condvar,
}

/// Cooperative cancellation signal
///
/// Transitions `false -> true` exactly once and never resets. `cancel()` is
/// idempotent and safe from any thread; `is_cancelled()` gives the
/// volatile-read guarantee (a cancel from thread A is observable by thread
/// B's very next check) via acquire/release atomics, with no lock on the
/// hot path.
///
/// Cloning is cheap; clones share the same signal.
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                next_sub_id: AtomicU64::new(0),
                subscribers: DashMap::with_hasher(RandomState::new()),
                wait_lock: Mutex::new(()),
                wait_cv: Condvar::new(),
            }),
        }
    }

    /// Request cancellation
    ///
    /// The first call sets the flag and wakes every subscribed primitive and
    /// every thread blocked in `wait_cancelled`. Later calls are no-ops.
    /// Never fails.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!("cancellation requested");

        // Pairs with the flag check under wait_lock in wait_cancelled:
        // a waiter either observes the flag or is parked when notify lands.
        drop(self.inner.wait_lock.lock());
        self.inner.wait_cv.notify_all();

        // Snapshot first so no map guard is held while waking.
        let hooks: Vec<Arc<dyn CancelWake>> = self
            .inner
            .subscribers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for hook in hooks {
            hook.wake();
        }
    }

    /// Non-blocking check of the cancel flag
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Block until cancelled or until `timeout` expires
    ///
    /// Returns `true` if the token is cancelled, `false` on timeout.
    /// With `None` this waits indefinitely for cancellation.
    pub fn wait_cancelled(&self, timeout: Option<Duration>) -> bool {
        let start = Instant::now();
        let mut guard = self.inner.wait_lock.lock();

        loop {
            if self.is_cancelled() {
                return true;
            }

            let slice = match timeout {
                Some(limit) => {
                    let Some(remaining) = limit.checked_sub(start.elapsed()) else {
                        return false;
                    };
                    remaining.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };

            self.inner.wait_cv.wait_for(&mut guard, slice);
        }
    }

    /// Register a wake hook, removed again when the guard drops
    ///
    /// Callers must re-check `is_cancelled` after subscribing and before
    /// parking; a cancel that lands between the two is otherwise lost.
    pub(crate) fn subscribe(&self, hook: Arc<dyn CancelWake>) -> CancelSubscription {
        let id = self.inner.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.insert(id, hook);
        CancelSubscription {
            inner: self.inner.clone(),
            id,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CancellationToken {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

/// RAII subscription guard; deregisters the wake hook on drop
pub(crate) struct CancelSubscription {
    inner: Arc<TokenInner>,
    id: u64,
}

impl Drop for CancelSubscription {
    fn drop(&mut self) {
        self.inner.subscribers.remove(&self.id);
    }
}
