/*!
 * Admission Set Implementation
 * Semaphore-bounded hash set with blocking and non-blocking admission
 */

use crate::cancel::{CancelWake, CancellationToken};
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{MAX_ADMISSION_CAPACITY, WAIT_SLICE};
use ahash::RandomState;
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Waiters {
    permit_freed: Condvar,
}

impl CancelWake for Waiters {
    fn wake(&self) {
        self.permit_freed.notify_all();
    }
}

struct Inner<T> {
    set: HashSet<T, RandomState>,
    permits: usize,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    waiters: Arc<Waiters>,
    capacity: usize,
}

/// Capacity-bounded concurrent set
///
/// A permit is acquired before insertion and released only after a confirmed
/// removal; an insertion that turns out to be a duplicate hands its permit
/// straight back. Removing an absent item never over-releases. The invariant
/// `permits + |set| == capacity` holds at every lock release and is checked
/// fatally - a violation is a CORE bug, not a recoverable condition.
///
/// Cloning is cheap; clones share the same set.
pub struct AdmissionSet<T>
where
    T: Eq + Hash,
{
    shared: Arc<Shared<T>>,
}

impl<T> AdmissionSet<T>
where
    T: Eq + Hash,
{
    /// Create a set admitting at most `capacity` distinct items
    ///
    /// # Panics
    ///
    /// Panics on zero capacity.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "admission capacity must be positive");
        let capacity = capacity.min(MAX_ADMISSION_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    set: HashSet::with_hasher(RandomState::new()),
                    permits: capacity,
                }),
                waiters: Arc::new(Waiters {
                    permit_freed: Condvar::new(),
                }),
                capacity,
            }),
        }
    }

    fn check_invariant(&self, inner: &Inner<T>) {
        assert!(
            inner.permits + inner.set.len() == self.shared.capacity,
            "admission invariant violated: permits {} + occupied {} != capacity {}",
            inner.permits,
            inner.set.len(),
            self.shared.capacity
        );
    }

    /// Non-blocking admission
    ///
    /// Returns `false` immediately when the item is already present or no
    /// permit is free. The rejected item is dropped; callers that need it
    /// back should clone before calling.
    pub fn try_add(&self, item: T) -> bool {
        let mut inner = self.shared.inner.lock();

        if inner.set.contains(&item) || inner.permits == 0 {
            return false;
        }

        // Acquire before insert; return the permit if the insert is a no-op
        inner.permits -= 1;
        if !inner.set.insert(item) {
            inner.permits += 1;
            self.check_invariant(&inner);
            return false;
        }

        self.check_invariant(&inner);
        true
    }

    /// Blocking admission
    ///
    /// Blocks for a permit when none is free. `Ok(true)` when the item was
    /// inserted, `Ok(false)` for a duplicate (the permit goes back),
    /// `Err(Cancelled)` when woken by cancellation before a permit frees up.
    pub fn add(&self, item: T, token: &CancellationToken) -> SyncResult<bool> {
        self.add_inner(item, None, token)
    }

    /// Timed variant of `add`
    pub fn add_timeout(
        &self,
        item: T,
        timeout: Duration,
        token: &CancellationToken,
    ) -> SyncResult<bool> {
        self.add_inner(item, Some(timeout), token)
    }

    fn add_inner(
        &self,
        item: T,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> SyncResult<bool> {
        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let start = Instant::now();
        let _sub = token.subscribe(self.shared.waiters.clone());
        let mut inner = self.shared.inner.lock();

        loop {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            if inner.set.contains(&item) {
                return Ok(false);
            }

            if inner.permits > 0 {
                inner.permits -= 1;
                let inserted = inner.set.insert(item);
                debug_assert!(inserted, "duplicate slipped past contains check");
                self.check_invariant(&inner);
                return Ok(true);
            }

            let slice = match timeout {
                Some(limit) => {
                    let Some(remaining) = limit.checked_sub(start.elapsed()) else {
                        return Err(SyncError::Timeout);
                    };
                    remaining.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            self.shared
                .waiters
                .permit_freed
                .wait_for(&mut inner, slice);
        }
    }

    /// Remove an item, releasing its permit
    ///
    /// The permit is released only on a confirmed removal: removing an
    /// absent item (or the same item twice) is a no-op and must not inflate
    /// the permit count.
    pub fn remove(&self, item: &T) -> bool {
        let mut inner = self.shared.inner.lock();

        if !inner.set.remove(item) {
            return false;
        }

        inner.permits += 1;
        self.check_invariant(&inner);
        drop(inner);

        self.shared.waiters.permit_freed.notify_one();
        true
    }

    pub fn contains(&self, item: &T) -> bool {
        self.shared.inner.lock().set.contains(item)
    }

    /// Number of admitted items
    pub fn len(&self) -> usize {
        self.shared.inner.lock().set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.inner.lock().set.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Permits currently free (`capacity - len`)
    pub fn available_permits(&self) -> usize {
        self.shared.inner.lock().permits
    }
}

impl<T> Clone for AdmissionSet<T>
where
    T: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> std::fmt::Debug for AdmissionSet<T>
where
    T: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("AdmissionSet")
            .field("capacity", &self.shared.capacity)
            .field("occupied", &inner.set.len())
            .field("permits", &inner.permits)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_backpressure_scenario() {
        let set = AdmissionSet::new(3);

        assert!(set.try_add("a"));
        assert!(set.try_add("b"));
        assert!(set.try_add("c"));
        assert!(!set.try_add("d"));

        assert!(set.remove(&"b"));
        assert!(set.try_add("d"));
        assert_eq!(set.len(), 3);
        assert_eq!(set.available_permits(), 0);
    }

    #[test]
    fn test_duplicate_add_keeps_permit() {
        let set = AdmissionSet::new(2);
        let token = CancellationToken::new();

        assert!(set.try_add(1));
        assert!(!set.try_add(1));
        assert_eq!(set.add(1, &token), Ok(false));
        assert_eq!(set.available_permits(), 1);
    }

    #[test]
    fn test_duplicate_remove_no_over_release() {
        let set = AdmissionSet::new(2);
        assert!(set.try_add(1));

        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert!(!set.remove(&42));
        assert_eq!(set.available_permits(), 2);
    }

    #[test]
    fn test_blocking_add_woken_by_remove() {
        let set = AdmissionSet::new(1);
        let token = CancellationToken::new();
        assert!(set.try_add(1u32));

        let set_clone = set.clone();
        let token_clone = token.clone();
        let handle = thread::spawn(move || set_clone.add(2, &token_clone));

        thread::sleep(Duration::from_millis(50));
        assert!(set.remove(&1));

        assert_eq!(handle.join().unwrap(), Ok(true));
        assert!(set.contains(&2));
    }

    #[test]
    fn test_blocking_add_cancelled() {
        let set = AdmissionSet::new(1);
        let token = CancellationToken::new();
        assert!(set.try_add(1u32));

        let set_clone = set.clone();
        let token_clone = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            (set_clone.add(2, &token_clone), start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let (result, elapsed) = handle.join().unwrap();
        assert_eq!(result, Err(SyncError::Cancelled));
        assert!(elapsed < Duration::from_secs(1));

        // Rollback left the counters consistent
        assert_eq!(set.len(), 1);
        assert_eq!(set.available_permits(), 0);
    }

    #[test]
    fn test_add_timeout_rolls_back() {
        let set = AdmissionSet::new(1);
        let token = CancellationToken::new();
        assert!(set.try_add(1u32));

        let result = set.add_timeout(2, Duration::from_millis(50), &token);
        assert_eq!(result, Err(SyncError::Timeout));
        assert_eq!(set.available_permits(), 0);
        assert_eq!(set.len(), 1);
    }
}
