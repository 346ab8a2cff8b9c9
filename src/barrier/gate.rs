/*!
 * Start/Stop Gate
 * One-shot two-stage latch for timing concurrent execution without startup skew
 */

use crate::cancel::{CancelWake, CancellationToken};
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{MAX_PARTIES, WAIT_SLICE};
use crate::pipeline::Executor;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Waiters {
    ready_zero: Condvar,
    done_zero: Condvar,
}

impl CancelWake for Waiters {
    fn wake(&self) {
        self.ready_zero.notify_all();
        self.done_zero.notify_all();
    }
}

/// One-shot two-stage latch
///
/// Two independent countdown counters, `ready` and `done`, both starting at
/// `parties`. Each only ever counts down to zero and never resets; a fresh
/// gate is required per measurement. Signals past zero are no-ops.
///
/// # Timing contract
///
/// Record the first timestamp strictly after `await_ready` returns and the
/// second strictly after `await_done` returns; the difference excludes
/// thread-startup jitter. `parties` must not exceed the number of threads
/// the executor can run simultaneously or the gate deadlocks - a sizing
/// hazard in the caller, not a gate bug.
///
/// Share across threads via `Arc`.
pub struct StartStopGate {
    ready_remaining: Mutex<usize>,
    done_remaining: Mutex<usize>,
    waiters: Arc<Waiters>,
    parties: usize,
}

impl StartStopGate {
    /// Create a gate for `parties` workers
    ///
    /// # Panics
    ///
    /// Panics on zero parties.
    pub fn new(parties: usize) -> Self {
        assert!(parties > 0, "gate parties must be positive");
        let parties = parties.min(MAX_PARTIES);

        Self {
            ready_remaining: Mutex::new(parties),
            done_remaining: Mutex::new(parties),
            waiters: Arc::new(Waiters {
                ready_zero: Condvar::new(),
                done_zero: Condvar::new(),
            }),
            parties,
        }
    }

    /// Signal this party is ready; the decrement to zero releases everyone
    /// blocked in `await_ready`
    pub fn signal_ready(&self) {
        Self::count_down(&self.ready_remaining, &self.waiters.ready_zero);
    }

    /// Signal this party is done; symmetric, independent counter
    pub fn signal_done(&self) {
        Self::count_down(&self.done_remaining, &self.waiters.done_zero);
    }

    fn count_down(counter: &Mutex<usize>, zero: &Condvar) {
        let mut remaining = counter.lock();
        if *remaining == 0 {
            // Saturating: extra signals on a released stage are no-ops
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            drop(remaining);
            zero.notify_all();
        }
    }

    /// Block until all parties have signalled ready
    pub fn await_ready(&self, token: &CancellationToken) -> SyncResult<()> {
        self.await_zero(&self.ready_remaining, &self.waiters.ready_zero, None, token)
    }

    /// Timed variant of `await_ready`
    pub fn await_ready_timeout(
        &self,
        timeout: Duration,
        token: &CancellationToken,
    ) -> SyncResult<()> {
        self.await_zero(
            &self.ready_remaining,
            &self.waiters.ready_zero,
            Some(timeout),
            token,
        )
    }

    /// Block until all parties have signalled done
    pub fn await_done(&self, token: &CancellationToken) -> SyncResult<()> {
        self.await_zero(&self.done_remaining, &self.waiters.done_zero, None, token)
    }

    /// Timed variant of `await_done`
    pub fn await_done_timeout(
        &self,
        timeout: Duration,
        token: &CancellationToken,
    ) -> SyncResult<()> {
        self.await_zero(
            &self.done_remaining,
            &self.waiters.done_zero,
            Some(timeout),
            token,
        )
    }

    /// Non-blocking probe of the ready stage
    pub fn try_await_ready(&self) -> bool {
        *self.ready_remaining.lock() == 0
    }

    /// Non-blocking probe of the done stage
    pub fn try_await_done(&self) -> bool {
        *self.done_remaining.lock() == 0
    }

    fn await_zero(
        &self,
        counter: &Mutex<usize>,
        zero: &Condvar,
        timeout: Option<Duration>,
        token: &CancellationToken,
    ) -> SyncResult<()> {
        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let start = Instant::now();
        let _sub = token.subscribe(self.waiters.clone());
        let mut remaining = counter.lock();

        loop {
            if *remaining == 0 {
                return Ok(());
            }
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let slice = match timeout {
                Some(limit) => {
                    let Some(left) = limit.checked_sub(start.elapsed()) else {
                        return Err(SyncError::Timeout);
                    };
                    left.min(WAIT_SLICE)
                }
                None => WAIT_SLICE,
            };
            zero.wait_for(&mut remaining, slice);
        }
    }

    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Time `parties` copies of `task` running concurrently
    ///
    /// Spawns the workers on `executor`, opens the measurement window once
    /// every worker has signalled ready, and closes it once every worker
    /// has signalled done. The returned duration excludes spawn skew.
    pub fn time_workers<F>(
        executor: &dyn Executor,
        parties: usize,
        task: F,
    ) -> SyncResult<Duration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let gate = Arc::new(StartStopGate::new(parties));
        let token = CancellationToken::new();
        let task = Arc::new(task);

        let handles: Vec<_> = (0..parties)
            .map(|i| {
                let gate = gate.clone();
                let token = token.clone();
                let task = task.clone();
                executor.spawn(
                    &format!("timed-worker-{i}"),
                    Box::new(move || {
                        gate.signal_ready();
                        if gate.await_ready(&token).is_ok() {
                            task();
                        }
                        gate.signal_done();
                    }),
                )
            })
            .collect();

        gate.await_ready(&token)?;
        let start = Instant::now();
        gate.await_done(&token)?;
        let elapsed = start.elapsed();

        for handle in handles {
            handle.join();
        }
        Ok(elapsed)
    }
}

impl std::fmt::Debug for StartStopGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartStopGate")
            .field("parties", &self.parties)
            .field("ready_remaining", &*self.ready_remaining.lock())
            .field("done_remaining", &*self.done_remaining.lock())
            .finish()
    }
}
