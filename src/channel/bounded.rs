/*!
 * Bounded Channel Implementation
 * Condvar-guarded FIFO with cancellation-aware blocking put/take
 */

use super::types::{ChannelStats, SendError, TrySendError};
use crate::cancel::{CancelWake, CancellationToken};
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{MAX_CHANNEL_CAPACITY, WAIT_SLICE};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Condvar bundle shared with cancellation subscriptions
struct Waiters {
    not_full: Condvar,
    not_empty: Condvar,
}

impl CancelWake for Waiters {
    fn wake(&self) {
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    waiters: Arc<Waiters>,
    capacity: usize,
}

/// Fixed-capacity FIFO channel
///
/// Elements transfer producer -> channel -> exactly one consumer, in strict
/// arrival order. Capacity violations are impossible by construction: `put`
/// blocks while full, `take` blocks while empty, and both fail fast with a
/// cancellation error once the token fires - including threads already
/// parked when `cancel()` is called.
///
/// Cloning is cheap; clones share the same buffer.
pub struct BoundedChannel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> BoundedChannel<T> {
    /// Create a channel with the given capacity
    ///
    /// # Panics
    ///
    /// Panics on zero capacity - a zero-slot channel can never accept an
    /// element and is a construction bug, not a runtime condition.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "channel capacity must be positive");
        let capacity = capacity.min(MAX_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                waiters: Arc::new(Waiters {
                    not_full: Condvar::new(),
                    not_empty: Condvar::new(),
                }),
                capacity,
            }),
        }
    }

    /// Insert an element, blocking while the channel is full
    ///
    /// Wakes one taker on success. Returns the item inside the error when
    /// the token is cancelled, whether before the call or mid-wait.
    pub fn put(&self, item: T, token: &CancellationToken) -> Result<(), SendError<T>> {
        self.put_inner(item, None, token)
    }

    /// Timed variant of `put`; fails with a timeout error once `timeout`
    /// elapses without a free slot
    pub fn put_timeout(
        &self,
        item: T,
        timeout: Duration,
        token: &CancellationToken,
    ) -> Result<(), SendError<T>> {
        self.put_inner(item, Some(timeout), token)
    }

    fn put_inner(
        &self,
        item: T,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> Result<(), SendError<T>> {
        if token.is_cancelled() {
            return Err(SendError::cancelled(item));
        }

        let start = Instant::now();
        let _sub = token.subscribe(self.shared.waiters.clone());
        let mut queue = self.shared.queue.lock();

        loop {
            // Re-checked after subscription and after every wake
            if token.is_cancelled() {
                return Err(SendError::cancelled(item));
            }

            if queue.len() < self.shared.capacity {
                queue.push_back(item);
                assert!(
                    queue.len() <= self.shared.capacity,
                    "channel occupancy {} above capacity {}",
                    queue.len(),
                    self.shared.capacity
                );
                drop(queue);
                self.shared.waiters.not_empty.notify_one();
                return Ok(());
            }

            let slice = match timeout {
                Some(limit) => {
                    let Some(remaining) = limit.checked_sub(start.elapsed()) else {
                        return Err(SendError::timeout(item));
                    };
                    remaining.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            self.shared.waiters.not_full.wait_for(&mut queue, slice);
        }
    }

    /// Remove the oldest element, blocking while the channel is empty
    ///
    /// Wakes one putter on success.
    pub fn take(&self, token: &CancellationToken) -> SyncResult<T> {
        self.take_inner(None, token)
    }

    /// Timed variant of `take`
    pub fn take_timeout(&self, timeout: Duration, token: &CancellationToken) -> SyncResult<T> {
        self.take_inner(Some(timeout), token)
    }

    fn take_inner(&self, timeout: Option<Duration>, token: &CancellationToken) -> SyncResult<T> {
        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let start = Instant::now();
        let _sub = token.subscribe(self.shared.waiters.clone());
        let mut queue = self.shared.queue.lock();

        loop {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            if let Some(item) = queue.pop_front() {
                drop(queue);
                self.shared.waiters.not_full.notify_one();
                return Ok(item);
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
            self.shared.waiters.not_empty.wait_for(&mut queue, slice);
        }
    }

    /// Non-blocking put
    ///
    /// Ignores cancellation: a try operation cannot hang, and shutdown code
    /// is allowed to keep probing after `cancel()`.
    pub fn try_put(&self, item: T) -> Result<(), TrySendError<T>> {
        let mut queue = self.shared.queue.lock();
        if queue.len() >= self.shared.capacity {
            return Err(TrySendError::Full(item));
        }

        queue.push_back(item);
        assert!(
            queue.len() <= self.shared.capacity,
            "channel occupancy {} above capacity {}",
            queue.len(),
            self.shared.capacity
        );
        drop(queue);
        self.shared.waiters.not_empty.notify_one();
        Ok(())
    }

    /// Non-blocking take; used for draining during shutdown
    pub fn try_take(&self) -> SyncResult<T> {
        let mut queue = self.shared.queue.lock();
        let Some(item) = queue.pop_front() else {
            return Err(SyncError::WouldBlock);
        };
        drop(queue);
        self.shared.waiters.not_full.notify_one();
        Ok(item)
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            capacity: self.shared.capacity,
            occupied: self.len(),
        }
    }
}

impl<T> Clone for BoundedChannel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BoundedChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("capacity", &self.shared.capacity)
            .field("occupied", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let channel = BoundedChannel::new(8);
        let token = CancellationToken::new();

        for i in 0..5 {
            channel.put(i, &token).unwrap();
        }
        for i in 0..5 {
            assert_eq!(channel.take(&token).unwrap(), i);
        }
        assert!(channel.is_empty());
    }

    #[test]
    fn test_try_put_full() {
        let channel = BoundedChannel::new(2);
        let token = CancellationToken::new();

        channel.put(1, &token).unwrap();
        channel.put(2, &token).unwrap();

        match channel.try_put(3) {
            Err(TrySendError::Full(item)) => assert_eq!(item, 3),
            other => panic!("expected Full, got {:?}", other),
        }
        assert_eq!(channel.len(), 2);
    }

    #[test]
    fn test_try_take_empty() {
        let channel = BoundedChannel::<u32>::new(2);
        assert_eq!(channel.try_take(), Err(SyncError::WouldBlock));
    }

    #[test]
    fn test_blocked_put_woken_by_take() {
        let channel = BoundedChannel::new(1);
        let token = CancellationToken::new();
        channel.put(1u32, &token).unwrap();

        let channel_clone = channel.clone();
        let token_clone = token.clone();
        let handle = thread::spawn(move || channel_clone.put(2, &token_clone));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(channel.take(&token).unwrap(), 1);

        handle.join().unwrap().unwrap();
        assert_eq!(channel.take(&token).unwrap(), 2);
    }

    #[test]
    fn test_blocked_put_cancelled() {
        let channel = BoundedChannel::new(1);
        let token = CancellationToken::new();
        channel.put(1u32, &token).unwrap();

        let channel_clone = channel.clone();
        let token_clone = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let result = channel_clone.put(2, &token_clone);
            (result, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        token.cancel();

        let (result, elapsed) = handle.join().unwrap();
        let err = result.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(err.into_inner(), 2);
        // Woken by the cancel subscription, not the full wait slice
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_put_timeout_returns_item() {
        let channel = BoundedChannel::new(1);
        let token = CancellationToken::new();
        channel.put(1u32, &token).unwrap();

        let err = channel
            .put_timeout(2, Duration::from_millis(50), &token)
            .unwrap_err();
        assert_eq!(err.kind(), crate::channel::SendErrorKind::Timeout);
        assert_eq!(err.into_inner(), 2);
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn test_take_timeout() {
        let channel = BoundedChannel::<u32>::new(1);
        let token = CancellationToken::new();

        let start = Instant::now();
        let result = channel.take_timeout(Duration::from_millis(50), &token);
        assert_eq!(result, Err(SyncError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_drain_after_cancel() {
        let channel = BoundedChannel::new(4);
        let token = CancellationToken::new();
        channel.put(1u32, &token).unwrap();
        channel.put(2, &token).unwrap();

        token.cancel();
        assert_eq!(channel.take(&token), Err(SyncError::Cancelled));

        // try_take keeps working so shutdown can drain
        assert_eq!(channel.try_take().unwrap(), 1);
        assert_eq!(channel.try_take().unwrap(), 2);
        assert_eq!(channel.try_take(), Err(SyncError::WouldBlock));
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_panics() {
        let _ = BoundedChannel::<u32>::new(0);
    }
}
